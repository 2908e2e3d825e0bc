//! Media Ports - camera devices, streams and frame sources.
//!
//! These model the browser media primitives as capabilities: a device
//! registry that can hand out streams, and a video source that can draw its
//! current frame into a pixel buffer.

use std::sync::Arc;

use image::RgbImage;

/// Kind of a media device or track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    VideoInput,
    AudioInput,
    AudioOutput,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::VideoInput => "videoinput",
            MediaKind::AudioInput => "audioinput",
            MediaKind::AudioOutput => "audiooutput",
        }
    }
}

/// One enumerated media device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDeviceInfo {
    pub device_id: String,
    pub kind: MediaKind,
    pub label: String,
}

/// A numeric constraint with an ideal and an optional hard maximum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub ideal: f64,
    pub max: Option<f64>,
}

impl Range {
    pub fn ideal(ideal: f64) -> Self {
        Self { ideal, max: None }
    }

    pub fn ideal_max(ideal: f64, max: f64) -> Self {
        Self {
            ideal,
            max: Some(max),
        }
    }
}

/// Camera facing preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    User,
    Environment,
}

/// Which camera to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelector {
    /// Exactly this device id.
    Exact(String),
    /// Any device facing this way.
    Facing(FacingMode),
}

/// Video constraints for a stream request.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoConstraints {
    pub width: Range,
    pub height: Range,
    pub frame_rate: Range,
    pub device: Option<DeviceSelector>,
}

/// Full constraint set for `get_user_media`.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaConstraints {
    pub video: VideoConstraints,
    pub audio: bool,
}

/// Raw failure reported by the media capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaFailure {
    /// The user or policy refused access.
    NotAllowed,
    /// No device satisfied the request.
    NotFound,
    /// The device exists but could not be opened.
    NotReadable,
    /// The constraints cannot be satisfied.
    Overconstrained { constraint: String },
    Other { message: String },
}

/// A live track of a media stream.
pub trait MediaTrack: Send + Sync {
    fn kind(&self) -> MediaKind;
    fn stop(&self);
}

/// A live media stream.
pub trait MediaStream: Send + Sync {
    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>>;
}

/// Camera device registry.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MediaDevicesPort: Send + Sync {
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, MediaFailure>;

    async fn get_user_media(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<Arc<dyn MediaStream>, MediaFailure>;

    /// Whether the device registry exists at all.
    fn supports_media_devices(&self) -> bool;

    /// Whether stream acquisition is available.
    fn supports_user_media(&self) -> bool;

    /// Whether peer connections are available.
    fn supports_peer_connection(&self) -> bool;
}

/// Intrinsic size of a video frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A live video source frames are captured from.
pub trait VideoSource: Send + Sync {
    /// Whether enough data is buffered to read the current frame.
    fn has_enough_data(&self) -> bool;

    /// Native resolution, if the source reports one.
    fn intrinsic_size(&self) -> Option<FrameSize>;

    /// Draw the current frame scaled to `size`.
    fn read_frame(&self, size: FrameSize) -> anyhow::Result<RgbImage>;
}
