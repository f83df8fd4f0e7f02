//! Camera hardware double.
//!
//! By default behaves like a healthy device: opening emits `DeviceOpened`,
//! session requests confirm immediately, and submitted still captures
//! deliver a payload into the still consumer. Tests flip flags on the
//! handle to simulate rejections, configure failures, and slow hardware.

use std::sync::{Arc, Mutex};

use crate::errors::CameraError;
use crate::hal::{
    CameraHal, HalEvent, HalEventSender, RawImage, SessionSurfaces, SurfaceId,
};
use crate::request::CaptureRequest;
use crate::surfaces::FrameProducer;
use crate::types::Size;

/// One call observed by the fake hardware, in the order issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HalCall {
    OpenDevice(String),
    CloseDevice,
    CreateSession {
        generation: u64,
        targets: Vec<SurfaceId>,
    },
    CloseSession,
    SetRepeating,
    SubmitCapture,
}

struct Shared {
    events: Option<HalEventSender>,
    calls: Vec<HalCall>,
    auto_open: bool,
    auto_configure: bool,
    fail_open: bool,
    fail_create_session: bool,
    fail_configure: bool,
    fail_set_repeating: bool,
    fail_submit_capture: bool,
    deliver_still_on_capture: bool,
    still_payload: Vec<u8>,
    still_producer: Option<FrameProducer>,
    stream_producer: Option<FrameProducer>,
    repeating_history: Vec<CaptureRequest>,
    submitted_captures: Vec<CaptureRequest>,
    last_generation: Option<u64>,
}

impl Shared {
    fn send(&self, event: HalEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

/// Test-side view of a [`FakeHal`]. Clones share the same state.
#[derive(Clone)]
pub struct FakeHalHandle {
    shared: Arc<Mutex<Shared>>,
}

impl FakeHalHandle {
    pub fn calls(&self) -> Vec<HalCall> {
        self.shared.lock().unwrap().calls.clone()
    }

    pub fn repeating_history(&self) -> Vec<CaptureRequest> {
        self.shared.lock().unwrap().repeating_history.clone()
    }

    pub fn submitted_captures(&self) -> Vec<CaptureRequest> {
        self.shared.lock().unwrap().submitted_captures.clone()
    }

    /// Generation of the most recent session request.
    pub fn last_generation(&self) -> Option<u64> {
        self.shared.lock().unwrap().last_generation
    }

    /// When false, `open_device` accepts but emits no callback; drive it
    /// manually with [`FakeHalHandle::send_event`].
    pub fn set_auto_open(&self, auto: bool) {
        self.shared.lock().unwrap().auto_open = auto;
    }

    /// When false, `create_session` accepts but never confirms on its own.
    pub fn set_auto_configure(&self, auto: bool) {
        self.shared.lock().unwrap().auto_configure = auto;
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.shared.lock().unwrap().fail_open = fail;
    }

    /// Synchronous rejection of `create_session`.
    pub fn set_fail_create_session(&self, fail: bool) {
        self.shared.lock().unwrap().fail_create_session = fail;
    }

    /// Asynchronous `SessionConfigureFailed` instead of confirmation.
    pub fn set_fail_configure(&self, fail: bool) {
        self.shared.lock().unwrap().fail_configure = fail;
    }

    pub fn set_fail_set_repeating(&self, fail: bool) {
        self.shared.lock().unwrap().fail_set_repeating = fail;
    }

    pub fn set_fail_submit_capture(&self, fail: bool) {
        self.shared.lock().unwrap().fail_submit_capture = fail;
    }

    pub fn set_deliver_still_on_capture(&self, deliver: bool) {
        self.shared.lock().unwrap().deliver_still_on_capture = deliver;
    }

    pub fn set_still_payload(&self, payload: Vec<u8>) {
        self.shared.lock().unwrap().still_payload = payload;
    }

    /// Inject a hardware callback directly.
    pub fn send_event(&self, event: HalEvent) {
        self.shared.lock().unwrap().send(event);
    }

    /// Deliver a raw frame into the stream consumer of the current session
    /// and signal availability.
    pub fn push_stream_frame(&self, image: RawImage) {
        let shared = self.shared.lock().unwrap();
        if let Some(producer) = &shared.stream_producer {
            producer.push(image);
            shared.send(HalEvent::StreamFrameAvailable);
        }
    }
}

/// An in-process camera stack.
pub struct FakeHal {
    shared: Arc<Mutex<Shared>>,
}

impl FakeHal {
    pub fn new() -> (FakeHal, FakeHalHandle) {
        let shared = Arc::new(Mutex::new(Shared {
            events: None,
            calls: Vec::new(),
            auto_open: true,
            auto_configure: true,
            fail_open: false,
            fail_create_session: false,
            fail_configure: false,
            fail_set_repeating: false,
            fail_submit_capture: false,
            deliver_still_on_capture: true,
            still_payload: vec![0xFF, 0xD8, 0xFF, 0xE0],
            still_producer: None,
            stream_producer: None,
            repeating_history: Vec::new(),
            submitted_captures: Vec::new(),
            last_generation: None,
        }));
        let handle = FakeHalHandle {
            shared: shared.clone(),
        };
        (FakeHal { shared }, handle)
    }
}

impl CameraHal for FakeHal {
    fn connect(&mut self, events: HalEventSender) {
        self.shared.lock().unwrap().events = Some(events);
    }

    fn open_device(&mut self, device_id: &str) -> Result<(), CameraError> {
        let mut shared = self.shared.lock().unwrap();
        shared.calls.push(HalCall::OpenDevice(device_id.to_string()));
        if shared.fail_open {
            return Err(CameraError::CameraAccess(
                "simulated open failure".to_string(),
            ));
        }
        if shared.auto_open {
            shared.send(HalEvent::DeviceOpened);
        }
        Ok(())
    }

    fn close_device(&mut self) {
        self.shared.lock().unwrap().calls.push(HalCall::CloseDevice);
    }

    fn create_session(
        &mut self,
        generation: u64,
        surfaces: SessionSurfaces,
    ) -> Result<(), CameraError> {
        let mut shared = self.shared.lock().unwrap();
        shared.calls.push(HalCall::CreateSession {
            generation,
            targets: surfaces.targets.clone(),
        });
        shared.last_generation = Some(generation);
        shared.still_producer = surfaces.still;
        shared.stream_producer = surfaces.stream;
        if shared.fail_create_session {
            return Err(CameraError::CameraAccess(
                "simulated session rejection".to_string(),
            ));
        }
        if shared.fail_configure {
            shared.send(HalEvent::SessionConfigureFailed { generation });
        } else if shared.auto_configure {
            shared.send(HalEvent::SessionConfigured { generation });
        }
        Ok(())
    }

    fn close_session(&mut self) {
        self.shared.lock().unwrap().calls.push(HalCall::CloseSession);
    }

    fn set_repeating_request(&mut self, request: &CaptureRequest) -> Result<(), CameraError> {
        let mut shared = self.shared.lock().unwrap();
        shared.calls.push(HalCall::SetRepeating);
        if shared.fail_set_repeating {
            return Err(CameraError::CameraAccess(
                "simulated repeating rejection".to_string(),
            ));
        }
        shared.repeating_history.push(request.clone());
        Ok(())
    }

    fn submit_capture(&mut self, request: &CaptureRequest) -> Result<(), CameraError> {
        let mut shared = self.shared.lock().unwrap();
        shared.calls.push(HalCall::SubmitCapture);
        if shared.fail_submit_capture {
            return Err(CameraError::CameraAccess(
                "simulated capture rejection".to_string(),
            ));
        }
        shared.submitted_captures.push(request.clone());
        if shared.deliver_still_on_capture {
            let payload = shared.still_payload.clone();
            if let Some(producer) = &shared.still_producer {
                producer.push(RawImage::jpeg(Size::new(1, 1), payload));
                shared.send(HalEvent::StillFrameAvailable);
            }
        }
        Ok(())
    }
}
