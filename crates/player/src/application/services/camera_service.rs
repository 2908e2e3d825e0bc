//! Camera Service - device discovery and stream acquisition
//!
//! Wraps a `MediaDevicesPort` with the constraint defaults the game uses and
//! turns raw media failures into user-facing `CameraError`s. Acquisition is
//! one of the few setup steps whose errors reach the caller.

use std::convert::Infallible;
use std::str::FromStr;
use std::sync::Arc;

use crate::ports::{
    CameraError, DeviceSelector, FacingMode, MediaConstraints, MediaDeviceInfo, MediaDevicesPort,
    MediaFailure, MediaKind, MediaStream, Range, VideoConstraints,
};

/// Capture quality preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraQuality {
    Low,
    #[default]
    Medium,
    High,
}

impl CameraQuality {
    pub fn as_str(self) -> &'static str {
        match self {
            CameraQuality::Low => "low",
            CameraQuality::Medium => "medium",
            CameraQuality::High => "high",
        }
    }
}

impl FromStr for CameraQuality {
    type Err = Infallible;

    /// Unknown names fall back to `Medium`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "low" => CameraQuality::Low,
            "high" => CameraQuality::High,
            _ => CameraQuality::Medium,
        })
    }
}

/// Video constraints for a quality preset, with no device preference.
pub fn camera_constraints(quality: CameraQuality) -> VideoConstraints {
    let (width, height, frame_rate) = match quality {
        CameraQuality::Low => (320.0, 240.0, Range::ideal_max(15.0, 20.0)),
        CameraQuality::Medium => (640.0, 480.0, Range::ideal_max(30.0, 30.0)),
        CameraQuality::High => (1280.0, 720.0, Range::ideal_max(30.0, 30.0)),
    };
    VideoConstraints {
        width: Range::ideal(width),
        height: Range::ideal(height),
        frame_rate,
        device: None,
    }
}

/// Default request: 640×480 at up to 30 fps, the given device or the
/// front camera, no audio.
pub fn default_constraints(device_id: Option<&str>) -> MediaConstraints {
    let device = match device_id {
        Some(id) => DeviceSelector::Exact(id.to_string()),
        None => DeviceSelector::Facing(FacingMode::User),
    };
    MediaConstraints {
        video: VideoConstraints {
            device: Some(device),
            ..camera_constraints(CameraQuality::Medium)
        },
        audio: false,
    }
}

impl From<MediaFailure> for CameraError {
    fn from(failure: MediaFailure) -> Self {
        match failure {
            MediaFailure::NotAllowed => CameraError::PermissionDenied,
            MediaFailure::NotFound => CameraError::NoDevice,
            MediaFailure::NotReadable => CameraError::DeviceBusy,
            MediaFailure::Overconstrained { .. } => CameraError::Overconstrained,
            MediaFailure::Other { message } => CameraError::Other(message),
        }
    }
}

/// Which media capabilities the host offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraSupport {
    pub get_user_media: bool,
    pub media_devices: bool,
    pub web_rtc: bool,
}

/// Stop every track of `stream`.
pub fn stop_camera(stream: &dyn MediaStream) {
    for track in stream.tracks() {
        track.stop();
        tracing::info!(kind = track.kind().as_str(), "Camera track stopped");
    }
}

/// Camera service for device discovery and stream acquisition
#[derive(Clone)]
pub struct CameraService {
    devices: Arc<dyn MediaDevicesPort>,
}

impl CameraService {
    pub fn new(devices: Arc<dyn MediaDevicesPort>) -> Self {
        Self { devices }
    }

    /// Video input devices. Enumeration failures are logged and yield none.
    pub async fn get_video_devices(&self) -> Vec<MediaDeviceInfo> {
        match self.devices.enumerate_devices().await {
            Ok(devices) => devices
                .into_iter()
                .filter(|device| device.kind == MediaKind::VideoInput)
                .collect(),
            Err(e) => {
                tracing::error!(error = ?e, "Error getting video devices");
                Vec::new()
            }
        }
    }

    /// Open the camera.
    ///
    /// `video` replaces the default video constraints wholesale, device
    /// selection included.
    pub async fn initialize_camera(
        &self,
        device_id: Option<&str>,
        video: Option<VideoConstraints>,
    ) -> Result<Arc<dyn MediaStream>, CameraError> {
        let mut constraints = default_constraints(device_id);
        if let Some(video) = video {
            constraints.video = video;
        }

        if !self.devices.supports_media_devices() || !self.devices.supports_user_media() {
            tracing::error!("Error initializing camera: getUserMedia is not supported");
            return Err(CameraError::Unsupported);
        }

        match self.devices.get_user_media(&constraints).await {
            Ok(stream) => {
                tracing::info!("Camera initialized successfully");
                Ok(stream)
            }
            Err(failure) => {
                tracing::error!(error = ?failure, "Error initializing camera");
                Err(failure.into())
            }
        }
    }

    pub fn check_camera_support(&self) -> CameraSupport {
        let media_devices = self.devices.supports_media_devices();
        let support = CameraSupport {
            get_user_media: media_devices && self.devices.supports_user_media(),
            media_devices,
            web_rtc: self.devices.supports_peer_connection(),
        };
        tracing::debug!(?support, "Camera support check");
        support
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::testing::{FakeStream, FakeTrack};
    use crate::ports::media::MockMediaDevicesPort;

    fn supported_port() -> MockMediaDevicesPort {
        let mut port = MockMediaDevicesPort::new();
        port.expect_supports_media_devices().return_const(true);
        port.expect_supports_user_media().return_const(true);
        port
    }

    fn stream_of(tracks: Vec<Arc<FakeTrack>>) -> Arc<dyn MediaStream> {
        FakeStream::new(tracks)
    }

    fn device(id: &str, kind: MediaKind) -> MediaDeviceInfo {
        MediaDeviceInfo {
            device_id: id.to_string(),
            kind,
            label: format!("{id} label"),
        }
    }

    #[tokio::test]
    async fn test_default_request_prefers_front_camera() {
        let mut port = supported_port();
        port.expect_get_user_media()
            .withf(|c| {
                c.video.device == Some(DeviceSelector::Facing(FacingMode::User))
                    && c.video.width == Range::ideal(640.0)
                    && c.video.height == Range::ideal(480.0)
                    && c.video.frame_rate == Range::ideal_max(30.0, 30.0)
                    && !c.audio
            })
            .times(1)
            .returning(|_| Ok(stream_of(vec![FakeTrack::new(MediaKind::VideoInput)])));

        let service = CameraService::new(Arc::new(port));
        let stream = service.initialize_camera(None, None).await.expect("stream");

        assert_eq!(stream.tracks().len(), 1);
    }

    #[tokio::test]
    async fn test_device_id_is_requested_exactly() {
        let mut port = supported_port();
        port.expect_get_user_media()
            .withf(|c| c.video.device == Some(DeviceSelector::Exact("cam-2".into())))
            .times(1)
            .returning(|_| Ok(stream_of(Vec::new())));

        let service = CameraService::new(Arc::new(port));

        assert!(service.initialize_camera(Some("cam-2"), None).await.is_ok());
    }

    #[tokio::test]
    async fn test_video_override_replaces_defaults() {
        let mut port = supported_port();
        port.expect_get_user_media()
            .withf(|c| c.video == camera_constraints(CameraQuality::High))
            .times(1)
            .returning(|_| Ok(stream_of(Vec::new())));

        let service = CameraService::new(Arc::new(port));
        let result = service
            .initialize_camera(Some("cam-2"), Some(camera_constraints(CameraQuality::High)))
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_missing_capability_is_unsupported() {
        let mut port = MockMediaDevicesPort::new();
        port.expect_supports_media_devices().return_const(true);
        port.expect_supports_user_media().return_const(false);

        let service = CameraService::new(Arc::new(port));
        let err = service
            .initialize_camera(None, None)
            .await
            .err()
            .expect("unsupported");

        assert_eq!(err, CameraError::Unsupported);
        assert_eq!(
            err.to_string(),
            "Camera error: getUserMedia is not supported in this browser"
        );
    }

    #[tokio::test]
    async fn test_failures_map_to_distinct_errors() {
        let cases = [
            (MediaFailure::NotAllowed, CameraError::PermissionDenied),
            (MediaFailure::NotFound, CameraError::NoDevice),
            (MediaFailure::NotReadable, CameraError::DeviceBusy),
            (
                MediaFailure::Overconstrained {
                    constraint: "width".into(),
                },
                CameraError::Overconstrained,
            ),
            (
                MediaFailure::Other {
                    message: "driver crashed".into(),
                },
                CameraError::Other("driver crashed".into()),
            ),
        ];

        for (failure, expected) in cases {
            let mut port = supported_port();
            port.expect_get_user_media()
                .returning(move |_| Err(failure.clone()));

            let service = CameraService::new(Arc::new(port));
            let err = service
                .initialize_camera(None, None)
                .await
                .err()
                .expect("failure");

            assert_eq!(err, expected);
        }
    }

    #[tokio::test]
    async fn test_video_devices_are_filtered() {
        let mut port = MockMediaDevicesPort::new();
        port.expect_enumerate_devices().returning(|| {
            Ok(vec![
                device("cam-1", MediaKind::VideoInput),
                device("mic-1", MediaKind::AudioInput),
                device("cam-2", MediaKind::VideoInput),
                device("spk-1", MediaKind::AudioOutput),
            ])
        });

        let service = CameraService::new(Arc::new(port));
        let ids: Vec<String> = service
            .get_video_devices()
            .await
            .into_iter()
            .map(|d| d.device_id)
            .collect();

        assert_eq!(ids, vec!["cam-1", "cam-2"]);
    }

    #[tokio::test]
    async fn test_enumeration_failure_yields_no_devices() {
        let mut port = MockMediaDevicesPort::new();
        port.expect_enumerate_devices()
            .returning(|| Err(MediaFailure::NotAllowed));

        let service = CameraService::new(Arc::new(port));

        assert!(service.get_video_devices().await.is_empty());
    }

    #[test]
    fn test_stop_camera_stops_every_track() {
        let video = FakeTrack::new(MediaKind::VideoInput);
        let audio = FakeTrack::new(MediaKind::AudioInput);
        let stream = FakeStream::new(vec![Arc::clone(&video), Arc::clone(&audio)]);

        stop_camera(stream.as_ref());

        assert!(video.is_stopped());
        assert!(audio.is_stopped());
    }

    #[test]
    fn test_quality_presets() {
        let low = camera_constraints(CameraQuality::Low);
        assert_eq!(low.width, Range::ideal(320.0));
        assert_eq!(low.frame_rate, Range::ideal_max(15.0, 20.0));

        let high = camera_constraints(CameraQuality::High);
        assert_eq!(high.height, Range::ideal(720.0));
        assert_eq!(high.frame_rate, Range::ideal_max(30.0, 30.0));
    }

    #[test]
    fn test_unknown_preset_is_medium() {
        assert_eq!("ultra".parse::<CameraQuality>(), Ok(CameraQuality::Medium));
        assert_eq!("HIGH".parse::<CameraQuality>(), Ok(CameraQuality::High));
    }

    #[test]
    fn test_support_check() {
        let mut port = MockMediaDevicesPort::new();
        port.expect_supports_media_devices().return_const(false);
        port.expect_supports_user_media().return_const(true);
        port.expect_supports_peer_connection().return_const(true);

        let support = CameraService::new(Arc::new(port)).check_camera_support();

        assert_eq!(
            support,
            CameraSupport {
                get_user_media: false,
                media_devices: false,
                web_rtc: true
            }
        );
    }
}
