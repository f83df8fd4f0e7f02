//! Media recorder adapter.
//!
//! Wraps the platform audio/video encoder behind [`RecorderBackend`] and
//! enforces the `Idle -> Prepared -> Recording <-> Paused -> Idle` state
//! machine on top of it. Encoding itself is the backend's job.

use std::path::{Path, PathBuf};

use crate::characteristics::{AudioCodec, ContainerFormat, RecordingProfile, VideoCodec};
use crate::errors::CameraError;
use crate::types::Size;

/// Adapter lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Prepared,
    Recording,
    Paused,
}

/// Platform encoder boundary. Configuration calls may be rejected
/// individually; the adapter maps any rejection during prepare into a single
/// `PrepareFailed`.
pub trait RecorderBackend: Send + 'static {
    fn set_audio_source(&mut self) -> Result<(), CameraError>;
    fn set_video_source(&mut self) -> Result<(), CameraError>;
    fn set_output_format(&mut self, container: ContainerFormat) -> Result<(), CameraError>;
    fn set_audio_encoder(&mut self, codec: AudioCodec) -> Result<(), CameraError>;
    fn set_video_encoder(&mut self, codec: VideoCodec) -> Result<(), CameraError>;
    fn set_video_bit_rate(&mut self, bit_rate: u32) -> Result<(), CameraError>;
    fn set_audio_sample_rate(&mut self, sample_rate: u32) -> Result<(), CameraError>;
    fn set_video_frame_rate(&mut self, frame_rate: u32) -> Result<(), CameraError>;
    fn set_video_size(&mut self, size: Size) -> Result<(), CameraError>;
    fn set_output_path(&mut self, path: &Path) -> Result<(), CameraError>;
    fn set_orientation_hint(&mut self, degrees: i32) -> Result<(), CameraError>;
    fn prepare(&mut self) -> Result<(), CameraError>;
    fn start(&mut self) -> Result<(), CameraError>;
    fn pause(&mut self) -> Result<(), CameraError>;
    fn resume(&mut self) -> Result<(), CameraError>;
    fn stop(&mut self) -> Result<(), CameraError>;
    fn reset(&mut self);
    fn release(&mut self);
    /// Whether this platform version supports pausable recording.
    fn supports_pause(&self) -> bool;
}

/// State-checked wrapper around a [`RecorderBackend`].
pub struct MediaRecorder {
    backend: Box<dyn RecorderBackend>,
    state: RecorderState,
    output_path: Option<PathBuf>,
}

impl MediaRecorder {
    pub fn new(backend: Box<dyn RecorderBackend>) -> Self {
        Self {
            backend,
            state: RecorderState::Idle,
            output_path: None,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    /// Configure the encoder for one recording.
    ///
    /// The platform encoder rejects configuration issued out of order: audio
    /// source, video source, output format, audio encoder, video encoder,
    /// bitrate, sample rate, frame rate, frame size, output path,
    /// orientation. Keep these calls in sequence.
    pub fn prepare(
        &mut self,
        output_path: &Path,
        profile: &RecordingProfile,
        audio_enabled: bool,
        orientation_hint: i32,
    ) -> Result<(), CameraError> {
        self.reset();

        let result = (|| -> Result<(), CameraError> {
            if audio_enabled {
                self.backend.set_audio_source()?;
            }
            self.backend.set_video_source()?;
            self.backend.set_output_format(profile.container)?;
            if audio_enabled {
                self.backend.set_audio_encoder(profile.audio_codec)?;
            }
            self.backend.set_video_encoder(profile.video_codec)?;
            self.backend.set_video_bit_rate(profile.video_bit_rate)?;
            if audio_enabled {
                self.backend
                    .set_audio_sample_rate(profile.audio_sample_rate)?;
            }
            self.backend.set_video_frame_rate(profile.video_frame_rate)?;
            self.backend.set_video_size(profile.video_size)?;
            self.backend.set_output_path(output_path)?;
            self.backend.set_orientation_hint(orientation_hint)?;
            self.backend.prepare()
        })();

        match result {
            Ok(()) => {
                self.state = RecorderState::Prepared;
                self.output_path = Some(output_path.to_path_buf());
                Ok(())
            }
            Err(e) => {
                self.reset();
                Err(CameraError::PrepareFailed(e.to_string()))
            }
        }
    }

    pub fn start(&mut self) -> Result<(), CameraError> {
        if self.state != RecorderState::Prepared {
            return Err(CameraError::IllegalState(
                "recorder start requires a prepared recorder".to_string(),
            ));
        }
        self.backend.start()?;
        self.state = RecorderState::Recording;
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), CameraError> {
        if !self.backend.supports_pause() {
            return Err(CameraError::UnsupportedOnPlatform("pauseVideoRecording"));
        }
        if self.state != RecorderState::Recording {
            return Err(CameraError::IllegalState(
                "recorder pause requires an active recording".to_string(),
            ));
        }
        self.backend.pause()?;
        self.state = RecorderState::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), CameraError> {
        if !self.backend.supports_pause() {
            return Err(CameraError::UnsupportedOnPlatform("resumeVideoRecording"));
        }
        if self.state != RecorderState::Paused {
            return Err(CameraError::IllegalState(
                "recorder resume requires a paused recording".to_string(),
            ));
        }
        self.backend.resume()?;
        self.state = RecorderState::Recording;
        Ok(())
    }

    /// Stop an active recording. Stopping while not recording is a no-op
    /// success.
    pub fn stop(&mut self) -> Result<(), CameraError> {
        match self.state {
            RecorderState::Recording | RecorderState::Paused => {
                let result = self.backend.stop();
                self.state = RecorderState::Idle;
                self.output_path = None;
                result
            }
            RecorderState::Idle | RecorderState::Prepared => Ok(()),
        }
    }

    /// Return to Idle. Always safe, including on a never-prepared adapter.
    pub fn reset(&mut self) {
        self.backend.reset();
        self.state = RecorderState::Idle;
        self.output_path = None;
    }

    /// Release the encoder resource. Always safe; a later prepare
    /// reconfigures the backend from scratch.
    pub fn release(&mut self) {
        self.backend.release();
        self.state = RecorderState::Idle;
        self.output_path = None;
    }
}
