use thiserror::Error;

/// Hardware-reported device lifecycle faults.
///
/// Each kind maps to a distinct user-visible message; all of them force a
/// full teardown and are never retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceErrorKind {
    /// Another client already holds the device.
    InUse,
    /// The platform limit on concurrently open cameras was hit.
    MaxInUse,
    /// A device policy forbids opening the camera.
    Disabled,
    /// The device itself hit a fatal fault.
    Fatal,
    /// The camera service (not the device) hit a fatal fault.
    ServiceFatal,
    Unknown,
}

impl DeviceErrorKind {
    pub fn message(&self) -> &'static str {
        match self {
            DeviceErrorKind::InUse => "The camera device is in use already.",
            DeviceErrorKind::MaxInUse => "Max cameras in use",
            DeviceErrorKind::Disabled => {
                "The camera device could not be opened due to a device policy."
            }
            DeviceErrorKind::Fatal => "The camera device has encountered a fatal error",
            DeviceErrorKind::ServiceFatal => "The camera service has encountered a fatal error.",
            DeviceErrorKind::Unknown => "Unknown camera error",
        }
    }
}

/// Why a one-shot still capture failed at the hardware layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFailureReason {
    /// The framework reported an internal error.
    Framework,
    /// The request was flushed by an abort before completing.
    Flushed,
    Unknown,
}

impl CaptureFailureReason {
    pub fn message(&self) -> &'static str {
        match self {
            CaptureFailureReason::Framework => "An error happened in the framework",
            CaptureFailureReason::Flushed => "The capture has failed due to an abort call",
            CaptureFailureReason::Unknown => "Unknown reason",
        }
    }
}

/// Error taxonomy for the capture core.
///
/// Every variant carries a stable machine-readable code (see [`CameraError::code`])
/// alongside the human-readable Display message, so a bridge layer can route
/// failures without parsing strings.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("no camera device registered with id '{0}'")]
    DeviceNotFound(String),

    #[error("resolution preset is not supported by device '{0}'")]
    UnsupportedPreset(String),

    #[error("file at path '{0}' already exists. Cannot overwrite.")]
    FileExists(String),

    #[error("camera access error: {0}")]
    CameraAccess(String),

    #[error("capture failure: {}", .0.message())]
    CaptureFailure(CaptureFailureReason),

    #[error("failed saving image: {0}")]
    Io(String),

    #[error("video recording failed: {0}")]
    VideoRecordingFailed(String),

    #[error("failed to configure camera session: {0}")]
    ConfigureFailed(String),

    #[error("failed to prepare media recorder: {0}")]
    PrepareFailed(String),

    #[error("{0} requires newer platform support")]
    UnsupportedOnPlatform(&'static str),

    #[error("operation not valid in the current state: {0}")]
    IllegalState(String),

    #[error("camera has been disposed")]
    Disposed,
}

impl CameraError {
    /// Stable machine-readable error code, wire-compatible with the bridge
    /// codes the command surface documents.
    pub fn code(&self) -> &'static str {
        match self {
            CameraError::DeviceNotFound(_) => "deviceNotFound",
            CameraError::UnsupportedPreset(_) => "unsupportedPreset",
            CameraError::FileExists(_) => "fileExists",
            CameraError::CameraAccess(_) => "cameraAccess",
            CameraError::CaptureFailure(_) => "captureFailure",
            CameraError::Io(_) => "IOError",
            CameraError::VideoRecordingFailed(_) => "videoRecordingFailed",
            CameraError::ConfigureFailed(_) => "configureFailed",
            CameraError::PrepareFailed(_) => "prepareFailed",
            CameraError::UnsupportedOnPlatform(_) => "unsupportedOnPlatform",
            CameraError::IllegalState(_) => "illegalState",
            CameraError::Disposed => "disposed",
        }
    }
}
