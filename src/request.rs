//! Immutable capture requests and their pure derivation.
//!
//! Control parameters are never mutated into a live template. Each change
//! re-derives a complete [`CaptureRequest`] from `(mode, ControlState,
//! characteristics)`, so a rejected reapply can never leave a half-updated
//! template observable to a later operation.

use crate::characteristics::CameraCharacteristics;
use crate::hal::SurfaceId;
use crate::types::{CaptureMode, ControlState, FlashMode, WhiteBalanceMode};

/// Hardware request template the session is created against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestTemplate {
    Preview,
    Record,
    StillCapture,
}

/// Hardware-level autofocus mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfMode {
    Off,
    ContinuousPicture,
}

/// Hardware-level auto-exposure mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeMode {
    On,
    OnAlwaysFlash,
    OnAutoFlash,
    OnAutoFlashRedEye,
}

/// Hardware-level flash actuator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashValue {
    Off,
    Torch,
}

/// Hardware-level auto-white-balance mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwbMode {
    Auto,
    CloudyDaylight,
    Fluorescent,
    Incandescent,
    Shade,
    Daylight,
}

/// A complete, immutable capture parameter set bound to a target list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub template: RequestTemplate,
    pub targets: Vec<SurfaceId>,
    pub af_mode: AfMode,
    pub ae_mode: AeMode,
    pub flash: FlashValue,
    pub awb_mode: AwbMode,
    pub control_mode_auto: bool,
    /// Ask the auto-exposure algorithm to stabilize before the exposure.
    pub precapture_trigger: bool,
    pub orientation_hint: Option<i32>,
}

/// Flash mode to (AE mode, flash value) for the repeating request. The
/// red-eye mode keeps its dedicated AE branch here.
pub fn flash_branch(flash: FlashMode) -> (AeMode, FlashValue) {
    match flash {
        FlashMode::Off => (AeMode::On, FlashValue::Off),
        FlashMode::On => (AeMode::OnAlwaysFlash, FlashValue::Off),
        FlashMode::Torch => (AeMode::On, FlashValue::Torch),
        FlashMode::Auto => (AeMode::OnAutoFlash, FlashValue::Off),
        FlashMode::RedEye => (AeMode::OnAutoFlashRedEye, FlashValue::Off),
    }
}

/// Flash mode to (AE mode, flash value) for a one-shot still capture. Auto
/// and RedEye intentionally share the plain auto-flash branch; no red-eye
/// pre-flash is issued on the still path.
pub fn still_flash_branch(flash: FlashMode) -> (AeMode, FlashValue) {
    match flash {
        FlashMode::Off => (AeMode::On, FlashValue::Off),
        FlashMode::On => (AeMode::OnAlwaysFlash, FlashValue::Off),
        FlashMode::Torch => (AeMode::On, FlashValue::Torch),
        FlashMode::Auto | FlashMode::RedEye => (AeMode::OnAutoFlash, FlashValue::Off),
    }
}

pub fn awb_value(white_balance: WhiteBalanceMode) -> AwbMode {
    match white_balance {
        WhiteBalanceMode::Auto => AwbMode::Auto,
        WhiteBalanceMode::Cloudy => AwbMode::CloudyDaylight,
        WhiteBalanceMode::Fluorescent => AwbMode::Fluorescent,
        WhiteBalanceMode::Incandescent => AwbMode::Incandescent,
        WhiteBalanceMode::Shade => AwbMode::Shade,
        WhiteBalanceMode::Sunny => AwbMode::Daylight,
    }
}

/// Whether the device supports any usable autofocus mode.
pub fn autofocus_supported(characteristics: &CameraCharacteristics) -> bool {
    characteristics
        .supported_af_modes
        .iter()
        .any(|mode| *mode != AfMode::Off)
}

pub fn af_value(enabled: bool, characteristics: &CameraCharacteristics) -> AfMode {
    if enabled && autofocus_supported(characteristics) {
        AfMode::ContinuousPicture
    } else {
        AfMode::Off
    }
}

/// Template used when creating the session for a mode.
pub fn session_template(mode: CaptureMode) -> RequestTemplate {
    match mode {
        CaptureMode::Preview => RequestTemplate::Preview,
        CaptureMode::PreviewWithStream | CaptureMode::Recording => RequestTemplate::Record,
    }
}

/// The sink surfaces a session binds for a mode. The still and stream
/// consumers are never part of the same session.
pub fn session_surfaces(mode: CaptureMode) -> Vec<SurfaceId> {
    match mode {
        CaptureMode::Preview => vec![SurfaceId::RenderTarget, SurfaceId::StillConsumer],
        CaptureMode::PreviewWithStream => {
            vec![SurfaceId::RenderTarget, SurfaceId::StreamConsumer]
        }
        CaptureMode::Recording => vec![SurfaceId::RenderTarget, SurfaceId::Recorder],
    }
}

/// The surfaces the repeating request actually writes to. In preview mode
/// the still consumer is bound into the session but only receives frames
/// from explicit one-shot captures.
pub fn request_targets(mode: CaptureMode) -> Vec<SurfaceId> {
    match mode {
        CaptureMode::Preview => vec![SurfaceId::RenderTarget],
        other => session_surfaces(other),
    }
}

/// Derive the repeating request for a mode from the persisted control state.
pub fn repeating_request(
    mode: CaptureMode,
    controls: &ControlState,
    characteristics: &CameraCharacteristics,
) -> CaptureRequest {
    let (ae_mode, flash) = if characteristics.flash_supported {
        flash_branch(controls.flash)
    } else {
        (AeMode::On, FlashValue::Off)
    };

    CaptureRequest {
        template: session_template(mode),
        targets: request_targets(mode),
        af_mode: af_value(controls.auto_focus, characteristics),
        ae_mode,
        flash,
        awb_mode: awb_value(controls.white_balance),
        control_mode_auto: true,
        precapture_trigger: false,
        orientation_hint: None,
    }
}

/// Derive the one-shot still capture request: current autofocus mode, the
/// five-way flash branch, a precapture trigger, and the orientation hint.
pub fn still_request(
    controls: &ControlState,
    characteristics: &CameraCharacteristics,
    orientation_hint: i32,
) -> CaptureRequest {
    let (ae_mode, flash) = if characteristics.flash_supported {
        still_flash_branch(controls.flash)
    } else {
        (AeMode::On, FlashValue::Off)
    };

    CaptureRequest {
        template: RequestTemplate::StillCapture,
        targets: vec![SurfaceId::StillConsumer],
        af_mode: af_value(controls.auto_focus, characteristics),
        ae_mode,
        flash,
        awb_mode: awb_value(controls.white_balance),
        control_mode_auto: false,
        precapture_trigger: true,
        orientation_hint: Some(orientation_hint),
    }
}
