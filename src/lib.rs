//! CamCore: single-camera capture session orchestration
//!
//! This crate owns the state machine that sits between a camera command
//! surface and a platform camera stack: one device, one capture session at
//! a time, rebuilt whenever the capture mode changes between plain preview,
//! preview with a raw frame stream, and video recording.
//!
//! # Features
//! - Still capture to disk with auto-exposure and flash control
//! - Video recording with pause/resume on supporting platforms
//! - Raw frame streaming with bounded drop-oldest delivery
//! - Flash, autofocus, and white balance applied to the live pipeline
//! - Stable error codes and an asynchronous event channel
//!
//! # Usage
//! The platform supplies the hardware, encoder, and display bindings; the
//! crate supplies the orchestration:
//! ```rust,ignore
//! use camcore::{Camera, CameraOpenParams, CharacteristicsProvider, ResolutionPreset};
//!
//! let params = CameraOpenParams::new("0", ResolutionPreset::High);
//! let (camera, mut events) = Camera::new(params, &provider, hal, target, recorder)?;
//! let reply = camera.open().await?;
//! camera.take_picture("/photos/img_001.jpg").await?;
//! ```
pub mod characteristics;
pub mod controller;
pub mod dispatcher;
pub mod errors;
pub mod hal;
pub mod recorder;
pub mod request;
pub mod surfaces;
pub mod types;

// Testing utilities - fakes for the hardware, encoder, and display seams
pub mod testing;

// Re-exports for convenience
pub use characteristics::{
    CameraCharacteristics, CharacteristicsProvider, DeviceDescriptor, RecordingProfile,
};
pub use controller::{Camera, CameraEvents, FrameStream};
pub use errors::{CameraError, CaptureFailureReason, DeviceErrorKind};
pub use hal::{CameraHal, HalEvent};
pub use recorder::RecorderBackend;
pub use surfaces::RenderTarget;
pub use types::{
    CameraEvent, CameraOpenParams, FlashMode, Frame, OpenReply, ResolutionPreset, Size,
    WhiteBalanceMode,
};

/// Initialize logging for the capture core
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "camcore=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}
