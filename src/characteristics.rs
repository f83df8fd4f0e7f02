//! Device characteristics provider.
//!
//! Pure lookup from a device identifier plus a resolution preset to the
//! static capabilities the controller needs: facing, sensor orientation,
//! flash availability, preview/capture sizes, supported autofocus modes, and
//! the recording profile. Device enumeration itself happens outside this
//! crate; callers register the descriptors they discovered.

use std::collections::HashMap;

use crate::errors::CameraError;
use crate::request::AfMode;
use crate::types::{ResolutionPreset, Size};

/// Preview buffers never exceed 1080p regardless of the capture size.
const MAX_PREVIEW_SIZE: Size = Size::new(1920, 1080);

/// Container format for recorded video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    Mpeg4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    H264,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodec {
    Aac,
}

/// Encoder settings resolved from the active resolution preset. Consumed by
/// the media recorder adapter in its fixed prepare order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingProfile {
    pub container: ContainerFormat,
    pub video_codec: VideoCodec,
    pub audio_codec: AudioCodec,
    pub video_bit_rate: u32,
    pub audio_sample_rate: u32,
    pub video_frame_rate: u32,
    pub video_size: Size,
}

/// Static description of one physical camera, registered by the caller.
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    pub device_id: String,
    pub is_front_facing: bool,
    /// Clockwise angle the sensor image must be rotated for upright display.
    pub sensor_orientation: i32,
    pub flash_supported: bool,
    pub supported_af_modes: Vec<AfMode>,
    /// Largest frame size the sensor pipeline can deliver.
    pub max_size: Size,
}

impl DeviceDescriptor {
    pub fn new(device_id: impl Into<String>, max_size: Size) -> Self {
        Self {
            device_id: device_id.into(),
            is_front_facing: false,
            sensor_orientation: 90,
            flash_supported: true,
            supported_af_modes: vec![AfMode::Off, AfMode::ContinuousPicture],
            max_size,
        }
    }

    pub fn front_facing(mut self, front: bool) -> Self {
        self.is_front_facing = front;
        self
    }

    pub fn sensor_orientation(mut self, degrees: i32) -> Self {
        self.sensor_orientation = degrees;
        self
    }

    pub fn flash_supported(mut self, supported: bool) -> Self {
        self.flash_supported = supported;
        self
    }

    pub fn af_modes(mut self, modes: Vec<AfMode>) -> Self {
        self.supported_af_modes = modes;
        self
    }
}

/// Resolved capabilities for one device at one preset.
#[derive(Debug, Clone)]
pub struct CameraCharacteristics {
    pub is_front_facing: bool,
    pub sensor_orientation: i32,
    pub flash_supported: bool,
    pub preview_size: Size,
    pub capture_size: Size,
    pub supported_af_modes: Vec<AfMode>,
    pub recording_profile: RecordingProfile,
}

/// Registry of device descriptors with preset resolution.
#[derive(Debug, Default)]
pub struct CharacteristicsProvider {
    devices: HashMap<String, DeviceDescriptor>,
}

impl CharacteristicsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: DeviceDescriptor) {
        self.devices
            .insert(descriptor.device_id.clone(), descriptor);
    }

    pub fn with_device(mut self, descriptor: DeviceDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    /// Look up a device and resolve the preset against its capabilities.
    pub fn resolve(
        &self,
        device_id: &str,
        preset: ResolutionPreset,
    ) -> Result<CameraCharacteristics, CameraError> {
        let device = self
            .devices
            .get(device_id)
            .ok_or_else(|| CameraError::DeviceNotFound(device_id.to_string()))?;

        let capture_size = match preset_size(preset) {
            Some(size) => {
                if !size.fits_within(device.max_size) {
                    return Err(CameraError::UnsupportedPreset(device_id.to_string()));
                }
                size
            }
            None => device.max_size,
        };

        let preview_size = capture_size.min(MAX_PREVIEW_SIZE);

        Ok(CameraCharacteristics {
            is_front_facing: device.is_front_facing,
            sensor_orientation: device.sensor_orientation,
            flash_supported: device.flash_supported,
            preview_size,
            capture_size,
            supported_af_modes: device.supported_af_modes.clone(),
            recording_profile: recording_profile(capture_size),
        })
    }
}

fn preset_size(preset: ResolutionPreset) -> Option<Size> {
    match preset {
        ResolutionPreset::Low => Some(Size::new(320, 240)),
        ResolutionPreset::Medium => Some(Size::new(640, 480)),
        ResolutionPreset::High => Some(Size::new(1280, 720)),
        ResolutionPreset::VeryHigh => Some(Size::new(1920, 1080)),
        ResolutionPreset::UltraHigh => Some(Size::new(3840, 2160)),
        ResolutionPreset::Max => None,
    }
}

fn recording_profile(video_size: Size) -> RecordingProfile {
    // Bitrate scales with the frame area; values sit in the usual range for
    // hardware H.264 encoders at 30fps.
    let bit_rate = match video_size.pixel_count() {
        n if n <= 320 * 240 => 1_000_000,
        n if n <= 640 * 480 => 2_500_000,
        n if n <= 1280 * 720 => 5_000_000,
        n if n <= 1920 * 1080 => 10_000_000,
        _ => 20_000_000,
    };

    RecordingProfile {
        container: ContainerFormat::Mpeg4,
        video_codec: VideoCodec::H264,
        audio_codec: AudioCodec::Aac,
        video_bit_rate: bit_rate,
        audio_sample_rate: 44_100,
        video_frame_rate: 30,
        video_size,
    }
}
