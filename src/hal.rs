//! Hardware boundary.
//!
//! The controller never talks to a concrete camera stack; it drives a
//! [`CameraHal`] and consumes [`HalEvent`]s the hardware pushes back. Every
//! hardware callback arrives as an event on the controller's queue, so the
//! state machine sees one serialized stream regardless of which thread the
//! platform dispatches on.

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::errors::{CameraError, CaptureFailureReason, DeviceErrorKind};
use crate::request::CaptureRequest;
use crate::surfaces::FrameProducer;
use crate::types::{PixelFormat, Size};

/// Identifies one of the sink surfaces a session can bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceId {
    RenderTarget,
    StillConsumer,
    StreamConsumer,
    Recorder,
}

/// Asynchronous hardware callbacks, delivered into the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HalEvent {
    DeviceOpened,
    DeviceClosed,
    DeviceDisconnected,
    DeviceError(DeviceErrorKind),
    /// Session creation confirmed. The generation tags which rebuild this
    /// confirmation belongs to; stale generations are ignored.
    SessionConfigured { generation: u64 },
    SessionConfigureFailed { generation: u64 },
    /// A one-shot still capture failed before producing a buffer.
    CaptureFailed(CaptureFailureReason),
    StillFrameAvailable,
    StreamFrameAvailable,
}

pub type HalEventSender = mpsc::UnboundedSender<HalEvent>;
pub type HalEventReceiver = mpsc::UnboundedReceiver<HalEvent>;

/// One plane of a hardware buffer. `bytes` still aliases pool memory in a
/// real backend; consumers must copy before the buffer is released.
#[derive(Debug, Clone)]
pub struct RawPlane {
    pub row_stride: usize,
    pub pixel_stride: usize,
    pub bytes: Bytes,
}

/// A buffer acquired from a consumer queue. Dropping it releases the buffer
/// back to the hardware pool.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub planes: Vec<RawPlane>,
}

impl RawImage {
    /// Single-plane compressed image, the shape the still consumer yields.
    pub fn jpeg(size: Size, bytes: Vec<u8>) -> Self {
        Self {
            width: size.width,
            height: size.height,
            format: PixelFormat::Jpeg,
            planes: vec![RawPlane {
                row_stride: bytes.len(),
                pixel_stride: 1,
                bytes: Bytes::from(bytes),
            }],
        }
    }
}

/// The sink surfaces a capture session binds, with producer handles for the
/// consumer-backed ones so the hardware can deliver buffers into them.
pub struct SessionSurfaces {
    pub targets: Vec<SurfaceId>,
    pub still: Option<FrameProducer>,
    pub stream: Option<FrameProducer>,
}

/// Contract the platform camera stack implements.
///
/// Calls are issued from the controller task only. Methods return
/// synchronously with accept/reject semantics; completion and failure of
/// accepted work arrives later as [`HalEvent`]s. `close_session` and
/// `close_device` are idempotent and must tolerate never-opened state.
pub trait CameraHal: Send + 'static {
    /// Install the event channel before any other call.
    fn connect(&mut self, events: HalEventSender);

    fn open_device(&mut self, device_id: &str) -> Result<(), CameraError>;

    fn close_device(&mut self);

    /// Request a new session bound to the given surfaces. Confirmation
    /// arrives as `SessionConfigured`/`SessionConfigureFailed` carrying the
    /// same generation.
    fn create_session(
        &mut self,
        generation: u64,
        surfaces: SessionSurfaces,
    ) -> Result<(), CameraError>;

    fn close_session(&mut self);

    /// Replace the repeating request driving the live pipeline. A rejection
    /// here must leave the previous repeating request running.
    fn set_repeating_request(&mut self, request: &CaptureRequest) -> Result<(), CameraError>;

    /// Submit a single capture (still path). The resulting buffer lands in
    /// the still consumer; failure arrives as `CaptureFailed`.
    fn submit_capture(&mut self, request: &CaptureRequest) -> Result<(), CameraError>;
}
