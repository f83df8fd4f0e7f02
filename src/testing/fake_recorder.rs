//! Recorder backend double.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::characteristics::{AudioCodec, ContainerFormat, VideoCodec};
use crate::errors::CameraError;
use crate::recorder::RecorderBackend;
use crate::types::Size;

/// One call observed by the fake backend, in the order issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderCall {
    SetAudioSource,
    SetVideoSource,
    SetOutputFormat,
    SetAudioEncoder,
    SetVideoEncoder,
    SetVideoBitRate(u32),
    SetAudioSampleRate(u32),
    SetVideoFrameRate(u32),
    SetVideoSize(Size),
    SetOutputPath(PathBuf),
    SetOrientationHint(i32),
    Prepare,
    Start,
    Pause,
    Resume,
    Stop,
    Reset,
    Release,
}

struct Shared {
    calls: Vec<RecorderCall>,
    fail_prepare: bool,
    fail_start: bool,
    fail_stop: bool,
    supports_pause: bool,
}

/// Test-side view of a [`FakeRecorderBackend`].
#[derive(Clone)]
pub struct FakeRecorderHandle {
    shared: Arc<Mutex<Shared>>,
}

impl FakeRecorderHandle {
    pub fn calls(&self) -> Vec<RecorderCall> {
        self.shared.lock().unwrap().calls.clone()
    }

    pub fn fail_prepare(&self, fail: bool) {
        self.shared.lock().unwrap().fail_prepare = fail;
    }

    pub fn fail_start(&self, fail: bool) {
        self.shared.lock().unwrap().fail_start = fail;
    }

    pub fn fail_stop(&self, fail: bool) {
        self.shared.lock().unwrap().fail_stop = fail;
    }

    pub fn set_supports_pause(&self, supported: bool) {
        self.shared.lock().unwrap().supports_pause = supported;
    }
}

/// An encoder that accepts every call and records it.
pub struct FakeRecorderBackend {
    shared: Arc<Mutex<Shared>>,
}

impl FakeRecorderBackend {
    pub fn new() -> (Box<dyn RecorderBackend>, FakeRecorderHandle) {
        let shared = Arc::new(Mutex::new(Shared {
            calls: Vec::new(),
            fail_prepare: false,
            fail_start: false,
            fail_stop: false,
            supports_pause: true,
        }));
        let handle = FakeRecorderHandle {
            shared: shared.clone(),
        };
        (Box::new(FakeRecorderBackend { shared }), handle)
    }

    fn record(&self, call: RecorderCall) {
        self.shared.lock().unwrap().calls.push(call);
    }
}

impl RecorderBackend for FakeRecorderBackend {
    fn set_audio_source(&mut self) -> Result<(), CameraError> {
        self.record(RecorderCall::SetAudioSource);
        Ok(())
    }

    fn set_video_source(&mut self) -> Result<(), CameraError> {
        self.record(RecorderCall::SetVideoSource);
        Ok(())
    }

    fn set_output_format(&mut self, _container: ContainerFormat) -> Result<(), CameraError> {
        self.record(RecorderCall::SetOutputFormat);
        Ok(())
    }

    fn set_audio_encoder(&mut self, _codec: AudioCodec) -> Result<(), CameraError> {
        self.record(RecorderCall::SetAudioEncoder);
        Ok(())
    }

    fn set_video_encoder(&mut self, _codec: VideoCodec) -> Result<(), CameraError> {
        self.record(RecorderCall::SetVideoEncoder);
        Ok(())
    }

    fn set_video_bit_rate(&mut self, bit_rate: u32) -> Result<(), CameraError> {
        self.record(RecorderCall::SetVideoBitRate(bit_rate));
        Ok(())
    }

    fn set_audio_sample_rate(&mut self, sample_rate: u32) -> Result<(), CameraError> {
        self.record(RecorderCall::SetAudioSampleRate(sample_rate));
        Ok(())
    }

    fn set_video_frame_rate(&mut self, frame_rate: u32) -> Result<(), CameraError> {
        self.record(RecorderCall::SetVideoFrameRate(frame_rate));
        Ok(())
    }

    fn set_video_size(&mut self, size: Size) -> Result<(), CameraError> {
        self.record(RecorderCall::SetVideoSize(size));
        Ok(())
    }

    fn set_output_path(&mut self, path: &Path) -> Result<(), CameraError> {
        self.record(RecorderCall::SetOutputPath(path.to_path_buf()));
        Ok(())
    }

    fn set_orientation_hint(&mut self, degrees: i32) -> Result<(), CameraError> {
        self.record(RecorderCall::SetOrientationHint(degrees));
        Ok(())
    }

    fn prepare(&mut self) -> Result<(), CameraError> {
        self.record(RecorderCall::Prepare);
        if self.shared.lock().unwrap().fail_prepare {
            return Err(CameraError::Io("simulated prepare failure".to_string()));
        }
        Ok(())
    }

    fn start(&mut self) -> Result<(), CameraError> {
        self.record(RecorderCall::Start);
        if self.shared.lock().unwrap().fail_start {
            return Err(CameraError::Io("simulated start failure".to_string()));
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<(), CameraError> {
        self.record(RecorderCall::Pause);
        Ok(())
    }

    fn resume(&mut self) -> Result<(), CameraError> {
        self.record(RecorderCall::Resume);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CameraError> {
        self.record(RecorderCall::Stop);
        if self.shared.lock().unwrap().fail_stop {
            return Err(CameraError::Io("simulated stop failure".to_string()));
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.record(RecorderCall::Reset);
    }

    fn release(&mut self) {
        self.record(RecorderCall::Release);
    }

    fn supports_pause(&self) -> bool {
        self.shared.lock().unwrap().supports_pause
    }
}
