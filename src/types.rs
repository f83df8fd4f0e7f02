//! Core data types shared across the capture pipeline.

use serde::{Deserialize, Serialize};

/// A pixel dimension pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Componentwise minimum, used to clamp preview buffers to a ceiling.
    pub fn min(self, other: Size) -> Size {
        Size::new(self.width.min(other.width), self.height.min(other.height))
    }

    pub fn fits_within(&self, other: Size) -> bool {
        self.width <= other.width && self.height <= other.height
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Resolution presets, mirroring the caller-facing preset vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionPreset {
    Low,
    Medium,
    High,
    VeryHigh,
    UltraHigh,
    Max,
}

/// Discrete flash modes offered to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlashMode {
    Off,
    On,
    Torch,
    Auto,
    RedEye,
}

impl Default for FlashMode {
    fn default() -> Self {
        FlashMode::Off
    }
}

/// Discrete white balance modes offered to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WhiteBalanceMode {
    Auto,
    Cloudy,
    Fluorescent,
    Incandescent,
    Shade,
    Sunny,
}

impl Default for WhiteBalanceMode {
    fn default() -> Self {
        WhiteBalanceMode::Auto
    }
}

/// Which capture pipeline is active. Exactly one at a time; switching
/// always goes through session teardown and rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Live preview plus the still-image consumer (still capture path).
    Preview,
    /// Live preview plus the raw-frame stream consumer.
    PreviewWithStream,
    /// Live preview plus the recorder surface.
    Recording,
}

/// Per-mode control parameters that survive session rebuilds. Persisted on
/// the controller, never on the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlState {
    pub auto_focus: bool,
    pub flash: FlashMode,
    pub white_balance: WhiteBalanceMode,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            auto_focus: true,
            flash: FlashMode::Off,
            white_balance: WhiteBalanceMode::Auto,
        }
    }
}

/// Pixel layout of frames coming off a consumer queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PixelFormat {
    /// Compressed still output.
    Jpeg,
    /// Planar YUV 4:2:0, three planes.
    Yuv420,
}

/// One contiguous memory region of a multi-plane image, already detached
/// from the hardware buffer. Field names match the wire payload the bridge
/// collaborator expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FramePlane {
    #[serde(rename = "bytesPerRow")]
    pub bytes_per_row: usize,
    #[serde(rename = "bytesPerPixel")]
    pub bytes_per_pixel: usize,
    pub bytes: Vec<u8>,
}

/// A fully detached frame record, produced once per consumed raw buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub planes: Vec<FramePlane>,
}

/// Push events emitted on the asynchronous event channel, independent of
/// any in-flight command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "eventType", rename_all = "camelCase")]
pub enum CameraEvent {
    CameraClosing,
    Error { description: String },
}

/// Successful `open()` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenReply {
    pub texture_id: i64,
    pub preview_width: u32,
    pub preview_height: u32,
}

/// Construction parameters for a camera instance.
#[derive(Debug, Clone)]
pub struct CameraOpenParams {
    pub device_id: String,
    pub preset: ResolutionPreset,
    pub enable_audio: bool,
    pub auto_focus: bool,
    pub flash: FlashMode,
}

impl CameraOpenParams {
    pub fn new(device_id: impl Into<String>, preset: ResolutionPreset) -> Self {
        Self {
            device_id: device_id.into(),
            preset,
            enable_audio: true,
            auto_focus: true,
            flash: FlashMode::Off,
        }
    }

    pub fn with_audio(mut self, enable_audio: bool) -> Self {
        self.enable_audio = enable_audio;
        self
    }

    pub fn with_auto_focus(mut self, auto_focus: bool) -> Self {
        self.auto_focus = auto_focus;
        self
    }

    pub fn with_flash(mut self, flash: FlashMode) -> Self {
        self.flash = flash;
        self
    }
}

/// Rounds a raw orientation-sensor angle to the nearest multiple of 90
/// degrees. Negative input means the sensor could not determine an angle
/// and yields `None`.
pub fn round_orientation(raw_degrees: i32) -> Option<i32> {
    if raw_degrees < 0 {
        return None;
    }
    Some(((raw_degrees as f64 / 90.0).round() as i32) * 90)
}

/// Orientation hint applied to still captures and recordings:
/// `(offset + sensor_orientation + 360) % 360`, where the offset is zero
/// when the current orientation is unknown, and otherwise flips sign for
/// front-facing devices.
pub fn media_orientation(
    current_orientation: Option<i32>,
    sensor_orientation: i32,
    is_front_facing: bool,
) -> i32 {
    let offset = match current_orientation {
        None => 0,
        Some(current) => {
            if is_front_facing {
                -current
            } else {
                current
            }
        }
    };
    (offset + sensor_orientation + 360) % 360
}
