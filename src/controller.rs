//! Capture session controller.
//!
//! Owns the capture-mode state machine. All mutable state lives on one
//! actor task; the [`Camera`] handle sends commands over a channel and the
//! hardware layer pushes [`HalEvent`]s into the same task, so commands and
//! hardware callbacks are serialized into a single stream. Every command
//! resolves exactly once via its oneshot responder; asynchronous faults go
//! out on the [`CameraEvents`] channel instead.

use std::path::PathBuf;

use tokio::sync::{mpsc, oneshot};

use crate::characteristics::{CameraCharacteristics, CharacteristicsProvider};
use crate::dispatcher::{drain_still, drain_stream};
use crate::errors::CameraError;
use crate::hal::{CameraHal, HalEvent, HalEventReceiver, HalEventSender, SessionSurfaces};
use crate::recorder::{MediaRecorder, RecorderBackend};
use crate::request::{
    autofocus_supported, repeating_request, session_surfaces, still_request,
};
use crate::surfaces::{RenderTarget, SurfaceSet};
use crate::types::{
    media_orientation, round_orientation, CameraEvent, CameraOpenParams, CaptureMode,
    ControlState, FlashMode, Frame, OpenReply, WhiteBalanceMode,
};

type Responder<T> = oneshot::Sender<Result<T, CameraError>>;

/// Lifecycle of the device + session pair, crossed with the active mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    /// No device, no session.
    Closed,
    /// Device open requested, awaiting the hardware callback.
    Opening,
    /// Session creation requested, awaiting hardware confirmation. After a
    /// configure failure the machine stays here with a dead generation: the
    /// device is open, no session is live, and the next mode change
    /// rebuilds.
    SessionConfiguring { mode: CaptureMode, generation: u64 },
    /// Session confirmed, repeating request running.
    Active { mode: CaptureMode },
    /// Teardown in progress.
    Closing,
    /// Terminal. No further operation is valid.
    Disposed,
}

/// Exists only while a recording is live; owned by the controller, encoded
/// by the recorder adapter.
#[derive(Debug, Clone)]
pub struct RecordingSession {
    pub file_path: PathBuf,
    pub is_paused: bool,
}

/// Work to run once the pending session configuration is confirmed.
enum DeferredAction {
    /// Start the recorder only after the recorder surface is live.
    StartRecorder,
}

enum Command {
    Open {
        reply: Responder<OpenReply>,
    },
    TakePicture {
        path: PathBuf,
        reply: Responder<()>,
    },
    StartVideoRecording {
        path: PathBuf,
        reply: Responder<()>,
    },
    StopVideoRecording {
        reply: Responder<()>,
    },
    PauseVideoRecording {
        reply: Responder<()>,
    },
    ResumeVideoRecording {
        reply: Responder<()>,
    },
    StartImageStream {
        reply: Responder<FrameStream>,
    },
    SetAutoFocus {
        enabled: bool,
        ack: oneshot::Sender<()>,
    },
    SetFlash {
        mode: FlashMode,
        ack: oneshot::Sender<()>,
    },
    SetWhiteBalance {
        mode: WhiteBalanceMode,
        ack: oneshot::Sender<()>,
    },
    UpdateOrientation {
        degrees: i32,
        ack: oneshot::Sender<()>,
    },
    Close {
        ack: oneshot::Sender<()>,
    },
    Dispose {
        ack: oneshot::Sender<()>,
    },
}

struct PendingStill {
    path: PathBuf,
    reply: Responder<()>,
}

/// Handle to a camera instance. Cloneable; all clones talk to the same
/// controller task. Dropping every clone disposes the camera.
#[derive(Clone)]
pub struct Camera {
    tx: mpsc::UnboundedSender<Command>,
}

/// Receiver half of the asynchronous event channel.
pub struct CameraEvents {
    rx: mpsc::UnboundedReceiver<CameraEvent>,
}

impl CameraEvents {
    pub async fn recv(&mut self) -> Option<CameraEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<CameraEvent> {
        self.rx.try_recv().ok()
    }
}

/// Stream of detached frames while preview-with-stream is active. Dropping
/// the stream detaches the listener; the consumer keeps running dark until
/// the session is reused.
pub struct FrameStream {
    rx: mpsc::UnboundedReceiver<Frame>,
}

impl FrameStream {
    pub async fn next(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    pub fn try_next(&mut self) -> Option<Frame> {
        self.rx.try_recv().ok()
    }
}

impl std::fmt::Debug for FrameStream {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("FrameStream").finish_non_exhaustive()
    }
}

impl Camera {
    /// Create a camera instance and spawn its controller task.
    ///
    /// Fails fast with `deviceNotFound` / `unsupportedPreset` when the
    /// device identifier or preset has no matching configuration; those are
    /// setup errors and are never retried.
    pub fn new<H: CameraHal>(
        params: CameraOpenParams,
        provider: &CharacteristicsProvider,
        mut hal: H,
        render_target: Box<dyn RenderTarget>,
        recorder_backend: Box<dyn RecorderBackend>,
    ) -> Result<(Camera, CameraEvents), CameraError> {
        let characteristics = provider.resolve(&params.device_id, params.preset)?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (hal_tx, hal_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        hal.connect(hal_tx.clone());

        let controller = Controller {
            hal,
            device_id: params.device_id,
            enable_audio: params.enable_audio,
            characteristics,
            surfaces: SurfaceSet::new(render_target),
            recorder: MediaRecorder::new(recorder_backend),
            controls: ControlState {
                auto_focus: params.auto_focus,
                flash: params.flash,
                white_balance: WhiteBalanceMode::Auto,
            },
            orientation: None,
            lifecycle: Lifecycle::Closed,
            generation: 0,
            recording: None,
            pending_open: None,
            pending_still: None,
            deferred: None,
            stream_sink: None,
            events: event_tx,
            commands: command_rx,
            hal_events: hal_rx,
            _hal_events_tx: hal_tx,
        };
        tokio::spawn(controller.run());

        Ok((Camera { tx: command_tx }, CameraEvents { rx: event_rx }))
    }

    /// Open the device and start a preview-mode session. Resolves with the
    /// render-target id and preview dimensions once the device is open and
    /// the first session has been issued.
    pub async fn open(&self) -> Result<OpenReply, CameraError> {
        self.request(|reply| Command::Open { reply }).await
    }

    /// Capture a still image to `path`. Fails with `fileExists` before any
    /// hardware work if the path is occupied; resolves success only after
    /// the acquired bytes are persisted.
    pub async fn take_picture(&self, path: impl Into<PathBuf>) -> Result<(), CameraError> {
        let path = path.into();
        self.request(move |reply| Command::TakePicture { path, reply })
            .await
    }

    /// Arm and start a video recording to `path`. The recorder starts only
    /// after the rebuilt session confirms.
    pub async fn start_video_recording(
        &self,
        path: impl Into<PathBuf>,
    ) -> Result<(), CameraError> {
        let path = path.into();
        self.request(move |reply| Command::StartVideoRecording { path, reply })
            .await
    }

    /// Stop recording and rebuild the plain preview session. No-op success
    /// when not recording.
    pub async fn stop_video_recording(&self) -> Result<(), CameraError> {
        self.request(|reply| Command::StopVideoRecording { reply })
            .await
    }

    /// No-op success when not recording.
    pub async fn pause_video_recording(&self) -> Result<(), CameraError> {
        self.request(|reply| Command::PauseVideoRecording { reply })
            .await
    }

    /// No-op success when not recording.
    pub async fn resume_video_recording(&self) -> Result<(), CameraError> {
        self.request(|reply| Command::ResumeVideoRecording { reply })
            .await
    }

    /// Rebuild the session around the raw-frame stream consumer and return
    /// the frame stream. Dropping the stream cancels delivery.
    pub async fn start_preview_with_image_stream(&self) -> Result<FrameStream, CameraError> {
        self.request(|reply| Command::StartImageStream { reply })
            .await
    }

    /// Fire-and-forget: a hardware rejection rolls the state back
    /// internally and is not surfaced.
    pub async fn set_auto_focus(&self, enabled: bool) {
        self.fire(|ack| Command::SetAutoFocus { enabled, ack }).await
    }

    /// Fire-and-forget; see [`Camera::set_auto_focus`].
    pub async fn set_flash_mode(&self, mode: FlashMode) {
        self.fire(|ack| Command::SetFlash { mode, ack }).await
    }

    /// Fire-and-forget; see [`Camera::set_auto_focus`].
    pub async fn set_white_balance(&self, mode: WhiteBalanceMode) {
        self.fire(|ack| Command::SetWhiteBalance { mode, ack }).await
    }

    /// Orientation-sensor input signal. Raw degrees are rounded to the
    /// nearest multiple of 90; negative values mean unknown and are ignored.
    pub async fn update_orientation(&self, degrees: i32) {
        self.fire(|ack| Command::UpdateOrientation { degrees, ack })
            .await
    }

    /// Tear down session, device, consumers, and recorder. Idempotent.
    pub async fn close(&self) {
        self.fire(|ack| Command::Close { ack }).await
    }

    /// `close()` plus releasing the render-target binding. Terminal: every
    /// later command fails with `disposed`.
    pub async fn dispose(&self) {
        self.fire(|ack| Command::Dispose { ack }).await
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Responder<T>) -> Command,
    ) -> Result<T, CameraError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(build(tx))
            .map_err(|_| CameraError::Disposed)?;
        rx.await.map_err(|_| CameraError::Disposed)?
    }

    async fn fire(&self, build: impl FnOnce(oneshot::Sender<()>) -> Command) {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(build(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

struct Controller<H: CameraHal> {
    hal: H,
    device_id: String,
    enable_audio: bool,
    characteristics: CameraCharacteristics,
    surfaces: SurfaceSet,
    recorder: MediaRecorder,
    controls: ControlState,
    orientation: Option<i32>,
    lifecycle: Lifecycle,
    /// Monotonic tag for session rebuilds; stale hardware confirmations are
    /// dropped by comparing against it.
    generation: u64,
    recording: Option<RecordingSession>,
    pending_open: Option<Responder<OpenReply>>,
    pending_still: Option<PendingStill>,
    deferred: Option<DeferredAction>,
    stream_sink: Option<mpsc::UnboundedSender<Frame>>,
    events: mpsc::UnboundedSender<CameraEvent>,
    commands: mpsc::UnboundedReceiver<Command>,
    hal_events: HalEventReceiver,
    // Keeps the hal event channel alive even if the hal drops its sender.
    _hal_events_tx: HalEventSender,
}

impl<H: CameraHal> Controller<H> {
    async fn run(mut self) {
        loop {
            // Hardware callbacks settle pending state transitions before any
            // newer command is admitted.
            tokio::select! {
                biased;
                event = self.hal_events.recv() => {
                    if let Some(event) = event {
                        self.on_hal_event(event);
                    }
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.on_command(command),
                    // Every handle dropped: dispose and end the task.
                    None => {
                        self.dispose_internal();
                        break;
                    }
                },
            }
        }
    }

    fn on_command(&mut self, command: Command) {
        if self.lifecycle == Lifecycle::Disposed {
            refuse_disposed(command);
            return;
        }
        match command {
            Command::Open { reply } => self.cmd_open(reply),
            Command::TakePicture { path, reply } => self.cmd_take_picture(path, reply),
            Command::StartVideoRecording { path, reply } => {
                self.cmd_start_video_recording(path, reply)
            }
            Command::StopVideoRecording { reply } => self.cmd_stop_video_recording(reply),
            Command::PauseVideoRecording { reply } => self.cmd_pause_video_recording(reply),
            Command::ResumeVideoRecording { reply } => self.cmd_resume_video_recording(reply),
            Command::StartImageStream { reply } => self.cmd_start_image_stream(reply),
            Command::SetAutoFocus { enabled, ack } => {
                self.cmd_set_auto_focus(enabled);
                let _ = ack.send(());
            }
            Command::SetFlash { mode, ack } => {
                self.cmd_set_flash(mode);
                let _ = ack.send(());
            }
            Command::SetWhiteBalance { mode, ack } => {
                self.cmd_set_white_balance(mode);
                let _ = ack.send(());
            }
            Command::UpdateOrientation { degrees, ack } => {
                if let Some(rounded) = round_orientation(degrees) {
                    self.orientation = Some(rounded);
                }
                let _ = ack.send(());
            }
            Command::Close { ack } => {
                self.close_internal();
                let _ = ack.send(());
            }
            Command::Dispose { ack } => {
                self.dispose_internal();
                let _ = ack.send(());
            }
        }
    }

    // Every hardware callback lands here; irrelevant (state, event) pairs
    // are deliberate no-ops so the transition function stays total.
    fn on_hal_event(&mut self, event: HalEvent) {
        match event {
            HalEvent::DeviceOpened => self.on_device_opened(),
            HalEvent::DeviceClosed => self.send_event(CameraEvent::CameraClosing),
            HalEvent::DeviceDisconnected => {
                self.close_internal();
                self.send_error("The camera was disconnected.");
            }
            HalEvent::DeviceError(kind) => {
                self.close_internal();
                self.send_error(kind.message());
            }
            HalEvent::SessionConfigured { generation } => self.on_session_configured(generation),
            HalEvent::SessionConfigureFailed { generation } => {
                self.on_session_configure_failed(generation)
            }
            HalEvent::CaptureFailed(reason) => {
                if let Some(pending) = self.pending_still.take() {
                    let _ = pending.reply.send(Err(CameraError::CaptureFailure(reason)));
                } else {
                    log::debug!("capture failure with no pending still capture: {:?}", reason);
                }
            }
            HalEvent::StillFrameAvailable => self.on_still_frame_available(),
            HalEvent::StreamFrameAvailable => self.on_stream_frame_available(),
        }
    }

    fn cmd_open(&mut self, reply: Responder<OpenReply>) {
        if self.lifecycle != Lifecycle::Closed {
            let _ = reply.send(Err(CameraError::IllegalState(
                "camera is already open".to_string(),
            )));
            return;
        }
        log::info!("opening camera device '{}'", self.device_id);
        self.lifecycle = Lifecycle::Opening;
        self.pending_open = Some(reply);
        if let Err(e) = self.hal.open_device(&self.device_id) {
            self.lifecycle = Lifecycle::Closed;
            if let Some(reply) = self.pending_open.take() {
                let _ = reply.send(Err(CameraError::CameraAccess(e.to_string())));
            }
        }
    }

    fn on_device_opened(&mut self) {
        if self.lifecycle != Lifecycle::Opening {
            log::debug!("ignoring device-opened callback in {:?}", self.lifecycle);
            return;
        }
        log::info!("camera device '{}' opened", self.device_id);
        self.surfaces
            .prepare_still_consumer(self.characteristics.capture_size);
        self.surfaces
            .prepare_stream_consumer(self.characteristics.preview_size);
        self.surfaces
            .bind_preview_surface(self.characteristics.preview_size);

        match self.rebuild_session(CaptureMode::Preview, None) {
            Ok(()) => {
                let reply_value = OpenReply {
                    texture_id: self.surfaces.texture_id(),
                    preview_width: self.characteristics.preview_size.width,
                    preview_height: self.characteristics.preview_size.height,
                };
                if let Some(reply) = self.pending_open.take() {
                    let _ = reply.send(Ok(reply_value));
                }
            }
            Err(e) => {
                if let Some(reply) = self.pending_open.take() {
                    let _ = reply.send(Err(CameraError::ConfigureFailed(e.to_string())));
                }
                self.close_internal();
            }
        }
    }

    /// Close any existing session and request a fresh one for `mode`.
    /// Teardown strictly precedes recreation; at most one session is ever
    /// live.
    fn rebuild_session(
        &mut self,
        mode: CaptureMode,
        deferred: Option<DeferredAction>,
    ) -> Result<(), CameraError> {
        self.hal.close_session();
        self.generation += 1;
        let generation = self.generation;

        let surfaces = SessionSurfaces {
            targets: session_surfaces(mode),
            still: match mode {
                CaptureMode::Preview => self.surfaces.still().map(|c| c.producer()),
                _ => None,
            },
            stream: match mode {
                CaptureMode::PreviewWithStream => self.surfaces.stream().map(|c| c.producer()),
                _ => None,
            },
        };

        self.deferred = deferred;
        self.lifecycle = Lifecycle::SessionConfiguring { mode, generation };
        log::debug!("requesting session generation {} for {:?}", generation, mode);
        if let Err(e) = self.hal.create_session(generation, surfaces) {
            self.deferred = None;
            return Err(e);
        }
        Ok(())
    }

    fn on_session_configured(&mut self, generation: u64) {
        let (mode, expected) = match self.lifecycle {
            Lifecycle::SessionConfiguring { mode, generation } => (mode, generation),
            Lifecycle::Closed | Lifecycle::Closing => {
                // Device torn down mid-configuration. Abort without touching
                // anything; the session template of that generation is gone.
                if generation == self.generation {
                    self.send_error("The camera was closed during configuration.");
                }
                return;
            }
            _ => {
                log::debug!("ignoring session-configured in {:?}", self.lifecycle);
                return;
            }
        };
        if generation != expected {
            log::debug!("ignoring stale session generation {}", generation);
            return;
        }

        // Re-apply persisted control state into the fresh template. Asking
        // for autofocus on a device without a usable AF mode downgrades the
        // persisted flag, not just the derived value.
        if self.controls.auto_focus && !autofocus_supported(&self.characteristics) {
            self.controls.auto_focus = false;
        }
        let request = repeating_request(mode, &self.controls, &self.characteristics);
        match self.hal.set_repeating_request(&request) {
            Ok(()) => {
                self.lifecycle = Lifecycle::Active { mode };
                log::info!("capture session {} active in {:?}", generation, mode);
                if let Some(action) = self.deferred.take() {
                    self.run_deferred(action);
                }
            }
            Err(e) => {
                self.deferred = None;
                self.send_error(e.to_string());
            }
        }
    }

    fn on_session_configure_failed(&mut self, generation: u64) {
        if generation != self.generation {
            log::debug!("ignoring stale configure failure {}", generation);
            return;
        }
        // A recording that was armed but never started unwinds with the
        // session it was waiting for.
        if matches!(self.deferred, Some(DeferredAction::StartRecorder)) {
            self.recording = None;
            self.recorder.reset();
        }
        self.deferred = None;
        self.send_error("Failed to configure camera session.");
    }

    fn run_deferred(&mut self, action: DeferredAction) {
        match action {
            DeferredAction::StartRecorder => {
                if let Err(e) = self.recorder.start() {
                    log::error!("recorder start failed after session configure: {}", e);
                    self.recording = None;
                    self.recorder.reset();
                    self.send_error(format!("video recording failed: {}", e));
                }
            }
        }
    }

    fn cmd_take_picture(&mut self, path: PathBuf, reply: Responder<()>) {
        if path.exists() {
            let _ = reply.send(Err(CameraError::FileExists(path.display().to_string())));
            return;
        }
        // The still consumer is only bound into preview sessions; a capture
        // submitted in any other mode would never produce a buffer.
        match self.lifecycle {
            Lifecycle::Active {
                mode: CaptureMode::Preview,
            } => {}
            Lifecycle::Active { .. } => {
                let _ = reply.send(Err(CameraError::IllegalState(
                    "still capture requires the preview session".to_string(),
                )));
                return;
            }
            _ => {
                let _ = reply.send(Err(CameraError::IllegalState(
                    "no active capture session".to_string(),
                )));
                return;
            }
        }
        if self.pending_still.is_some() {
            let _ = reply.send(Err(CameraError::IllegalState(
                "a still capture is already in progress".to_string(),
            )));
            return;
        }

        let hint = media_orientation(
            self.orientation,
            self.characteristics.sensor_orientation,
            self.characteristics.is_front_facing,
        );
        let request = still_request(&self.controls, &self.characteristics, hint);
        log::info!("capturing still image to {}", path.display());
        if let Err(e) = self.hal.submit_capture(&request) {
            let _ = reply.send(Err(CameraError::CameraAccess(e.to_string())));
            return;
        }
        self.pending_still = Some(PendingStill { path, reply });
    }

    fn on_still_frame_available(&mut self) {
        let Some(pending) = self.pending_still.take() else {
            log::debug!("still frame available with no pending capture");
            return;
        };
        let Some(consumer) = self.surfaces.still() else {
            let _ = pending.reply.send(Err(CameraError::CameraAccess(
                "still consumer is gone".to_string(),
            )));
            return;
        };
        match drain_still(consumer) {
            // The buffer is already released; only the detached bytes move
            // to disk, off the controller task.
            Some(bytes) => {
                tokio::spawn(async move {
                    let PendingStill { path, reply } = pending;
                    let write =
                        tokio::task::spawn_blocking(move || std::fs::write(&path, bytes)).await;
                    let result = match write {
                        Ok(Ok(())) => Ok(()),
                        Ok(Err(e)) => Err(CameraError::Io(e.to_string())),
                        Err(e) => Err(CameraError::Io(format!("save task failed: {}", e))),
                    };
                    let _ = reply.send(result);
                });
            }
            // Spurious availability callback; keep waiting for the buffer.
            None => self.pending_still = Some(pending),
        }
    }

    fn cmd_start_video_recording(&mut self, path: PathBuf, reply: Responder<()>) {
        if path.exists() {
            let _ = reply.send(Err(CameraError::FileExists(path.display().to_string())));
            return;
        }
        if self.recording.is_some() {
            let _ = reply.send(Err(CameraError::VideoRecordingFailed(
                "a recording is already in progress".to_string(),
            )));
            return;
        }
        if !self.device_ready() {
            let _ = reply.send(Err(CameraError::VideoRecordingFailed(
                "camera device is not open".to_string(),
            )));
            return;
        }

        let hint = media_orientation(
            self.orientation,
            self.characteristics.sensor_orientation,
            self.characteristics.is_front_facing,
        );
        if let Err(e) = self.recorder.prepare(
            &path,
            &self.characteristics.recording_profile,
            self.enable_audio,
            hint,
        ) {
            let _ = reply.send(Err(CameraError::VideoRecordingFailed(e.to_string())));
            return;
        }

        log::info!("starting video recording to {}", path.display());
        self.recording = Some(RecordingSession {
            file_path: path,
            is_paused: false,
        });
        match self.rebuild_session(CaptureMode::Recording, Some(DeferredAction::StartRecorder)) {
            Ok(()) => {
                let _ = reply.send(Ok(()));
            }
            Err(e) => {
                // Recording flag and adapter state unwind together.
                self.recording = None;
                self.recorder.reset();
                let _ = reply.send(Err(CameraError::VideoRecordingFailed(e.to_string())));
            }
        }
    }

    fn cmd_stop_video_recording(&mut self, reply: Responder<()>) {
        if self.recording.take().is_none() {
            let _ = reply.send(Ok(()));
            return;
        }
        log::info!("stopping video recording");
        let stopped = self.recorder.stop();
        self.recorder.reset();
        let rebuilt = if self.device_ready() {
            self.rebuild_session(CaptureMode::Preview, None)
        } else {
            Ok(())
        };
        let result = stopped
            .and(rebuilt)
            .map_err(|e| CameraError::VideoRecordingFailed(e.to_string()));
        let _ = reply.send(result);
    }

    fn cmd_pause_video_recording(&mut self, reply: Responder<()>) {
        if self.recording.is_none() {
            let _ = reply.send(Ok(()));
            return;
        }
        match self.recorder.pause() {
            Ok(()) => {
                if let Some(recording) = self.recording.as_mut() {
                    recording.is_paused = true;
                }
                let _ = reply.send(Ok(()));
            }
            Err(e) => {
                let _ = reply.send(Err(CameraError::VideoRecordingFailed(e.to_string())));
            }
        }
    }

    fn cmd_resume_video_recording(&mut self, reply: Responder<()>) {
        if self.recording.is_none() {
            let _ = reply.send(Ok(()));
            return;
        }
        match self.recorder.resume() {
            Ok(()) => {
                if let Some(recording) = self.recording.as_mut() {
                    recording.is_paused = false;
                }
                let _ = reply.send(Ok(()));
            }
            Err(e) => {
                let _ = reply.send(Err(CameraError::VideoRecordingFailed(e.to_string())));
            }
        }
    }

    fn cmd_start_image_stream(&mut self, reply: Responder<FrameStream>) {
        if !self.device_ready() {
            let _ = reply.send(Err(CameraError::IllegalState(
                "camera device is not open".to_string(),
            )));
            return;
        }
        if self.recording.is_some() {
            let _ = reply.send(Err(CameraError::IllegalState(
                "cannot stream frames while recording".to_string(),
            )));
            return;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.stream_sink = Some(tx);
        log::info!("starting preview with image stream");
        match self.rebuild_session(CaptureMode::PreviewWithStream, None) {
            Ok(()) => {
                let _ = reply.send(Ok(FrameStream { rx }));
            }
            Err(e) => {
                self.stream_sink = None;
                let _ = reply.send(Err(CameraError::ConfigureFailed(e.to_string())));
            }
        }
    }

    fn on_stream_frame_available(&mut self) {
        let Some(consumer) = self.surfaces.stream() else {
            return;
        };
        // Drain (and thereby release) the buffer even when nobody listens.
        let Some(frame) = drain_stream(consumer) else {
            return;
        };
        if let Some(sink) = &self.stream_sink {
            if sink.send(frame).is_err() {
                log::debug!("image stream listener detached");
                self.stream_sink = None;
            }
        }
    }

    fn cmd_set_auto_focus(&mut self, enabled: bool) {
        let effective = enabled && autofocus_supported(&self.characteristics);
        if self.controls.auto_focus == effective {
            return;
        }
        let saved = self.controls.auto_focus;
        self.controls.auto_focus = effective;
        if !self.reapply_repeating() {
            self.controls.auto_focus = saved;
        }
    }

    fn cmd_set_flash(&mut self, mode: FlashMode) {
        if self.controls.flash == mode {
            return;
        }
        let saved = self.controls.flash;
        self.controls.flash = mode;
        if !self.reapply_repeating() {
            self.controls.flash = saved;
        }
    }

    fn cmd_set_white_balance(&mut self, mode: WhiteBalanceMode) {
        if self.controls.white_balance == mode {
            return;
        }
        let saved = self.controls.white_balance;
        self.controls.white_balance = mode;
        if !self.reapply_repeating() {
            self.controls.white_balance = saved;
        }
    }

    /// Push the current control state into the live repeating request.
    /// Returns false when the hardware rejected it (caller rolls back).
    /// With no live session this is a success: the persisted state applies
    /// on the next rebuild.
    fn reapply_repeating(&mut self) -> bool {
        let mode = match self.lifecycle {
            Lifecycle::Active { mode } => mode,
            _ => return true,
        };
        let request = repeating_request(mode, &self.controls, &self.characteristics);
        match self.hal.set_repeating_request(&request) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("repeating request rejected, rolling back controls: {}", e);
                false
            }
        }
    }

    fn device_ready(&self) -> bool {
        matches!(
            self.lifecycle,
            Lifecycle::SessionConfiguring { .. } | Lifecycle::Active { .. }
        )
    }

    /// Tear down session, device, consumers, and recorder, in that order.
    /// Every step is individually idempotent; pending commands resolve with
    /// an error so nothing dangles.
    fn close_internal(&mut self) {
        if self.lifecycle == Lifecycle::Disposed {
            return;
        }
        log::debug!("closing camera resources");
        self.lifecycle = Lifecycle::Closing;
        self.hal.close_session();
        self.hal.close_device();
        self.surfaces.release_all();
        self.recorder.reset();
        self.recorder.release();
        self.recording = None;
        self.stream_sink = None;
        self.deferred = None;
        if let Some(reply) = self.pending_open.take() {
            let _ = reply.send(Err(CameraError::CameraAccess(
                "the camera was closed".to_string(),
            )));
        }
        if let Some(pending) = self.pending_still.take() {
            let _ = pending.reply.send(Err(CameraError::CameraAccess(
                "the camera was closed during capture".to_string(),
            )));
        }
        self.lifecycle = Lifecycle::Closed;
    }

    fn dispose_internal(&mut self) {
        if self.lifecycle == Lifecycle::Disposed {
            return;
        }
        self.close_internal();
        self.surfaces.release_render_target();
        self.lifecycle = Lifecycle::Disposed;
        log::info!("camera '{}' disposed", self.device_id);
    }

    fn send_event(&self, event: CameraEvent) {
        if self.events.send(event).is_err() {
            log::debug!("event channel closed; event dropped");
        }
    }

    fn send_error(&self, description: impl Into<String>) {
        let description = description.into();
        log::error!("camera error: {}", description);
        self.send_event(CameraEvent::Error { description });
    }
}

// Post-dispose commands fail fast; fire-and-forget ones just ack.
fn refuse_disposed(command: Command) {
    match command {
        Command::Open { reply } => {
            let _ = reply.send(Err(CameraError::Disposed));
        }
        Command::TakePicture { reply, .. }
        | Command::StartVideoRecording { reply, .. }
        | Command::StopVideoRecording { reply }
        | Command::PauseVideoRecording { reply }
        | Command::ResumeVideoRecording { reply } => {
            let _ = reply.send(Err(CameraError::Disposed));
        }
        Command::StartImageStream { reply } => {
            let _ = reply.send(Err(CameraError::Disposed));
        }
        Command::SetAutoFocus { ack, .. }
        | Command::SetFlash { ack, .. }
        | Command::SetWhiteBalance { ack, .. }
        | Command::UpdateOrientation { ack, .. }
        | Command::Close { ack }
        | Command::Dispose { ack } => {
            let _ = ack.send(());
        }
    }
}
