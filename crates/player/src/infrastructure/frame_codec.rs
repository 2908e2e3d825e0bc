//! JPEG frame capture and downscaling for the video feed.
//!
//! Frames travel as bare base64 JPEG strings. Capture draws the current
//! frame of a [`VideoSource`] at its native size; resize shrinks an encoded
//! frame to fit a bounding box. Resize never fails outward: any decode or
//! encode problem hands back the input unchanged.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbImage};

use crate::ports::{FrameSize, VideoSource};

/// Size used when a source reports no native resolution.
pub const FALLBACK_FRAME_SIZE: FrameSize = FrameSize::new(640, 480);

/// JPEG quality used for a quality factor outside [0, 1].
const DEFAULT_JPEG_QUALITY: u8 = 92;

/// Encoding defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodecSettings {
    pub capture_quality: f64,
    pub max_width: u32,
    pub max_height: u32,
    pub resize_quality: f64,
}

impl Default for CodecSettings {
    fn default() -> Self {
        Self {
            capture_quality: 0.8,
            max_width: 320,
            max_height: 240,
            resize_quality: 0.7,
        }
    }
}

/// One encoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    /// Base64 JPEG, no data-URL prefix.
    pub data: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec {
    settings: CodecSettings,
}

impl FrameCodec {
    pub fn new(settings: CodecSettings) -> Self {
        Self { settings }
    }

    /// Capture at the configured capture quality.
    pub fn capture_default(&self, source: &dyn VideoSource) -> Option<CapturedFrame> {
        self.capture(source, self.settings.capture_quality)
    }

    /// Encode the source's current frame at its native resolution.
    ///
    /// `None` while the source is still buffering; poll again later. Draw or
    /// encode failures are logged and also yield `None`.
    pub fn capture(&self, source: &dyn VideoSource, quality: f64) -> Option<CapturedFrame> {
        if !source.has_enough_data() {
            return None;
        }

        let size = source
            .intrinsic_size()
            .filter(|size| size.width > 0 && size.height > 0)
            .unwrap_or(FALLBACK_FRAME_SIZE);

        let frame = match source.read_frame(size) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, "Error capturing frame");
                return None;
            }
        };

        match encode_jpeg(&frame, jpeg_quality(quality)) {
            Ok(bytes) => Some(CapturedFrame {
                data: STANDARD.encode(bytes),
                width: frame.width(),
                height: frame.height(),
            }),
            Err(e) => {
                tracing::error!(error = %e, "Error capturing frame");
                None
            }
        }
    }

    /// Resize to the configured bounds and quality.
    pub async fn resize_default(&self, frame: &str) -> String {
        self.resize(
            frame,
            self.settings.max_width,
            self.settings.max_height,
            self.settings.resize_quality,
        )
        .await
    }

    /// Shrink `frame` to fit within `max_width`×`max_height`, keeping its
    /// aspect ratio. Frames that already fit keep their size but are still
    /// re-encoded at `quality`. Returns `frame` unchanged on any failure.
    pub async fn resize(&self, frame: &str, max_width: u32, max_height: u32, quality: f64) -> String {
        let input = frame.to_string();
        let quality = jpeg_quality(quality);
        let result = tokio::task::spawn_blocking(move || {
            resize_encoded(&input, max_width, max_height, quality)
        })
        .await;

        match result {
            Ok(Ok(resized)) => resized.data,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Error resizing frame, sending original");
                frame.to_string()
            }
            Err(e) => {
                tracing::error!(error = %e, "Resize task failed, sending original");
                frame.to_string()
            }
        }
    }
}

/// Map a quality factor in [0, 1] to a JPEG quality in 1..=100.
/// Anything else, NaN included, gets the default quality.
pub fn jpeg_quality(factor: f64) -> u8 {
    if !(0.0..=1.0).contains(&factor) {
        return DEFAULT_JPEG_QUALITY;
    }
    (factor * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Largest size within the bounds that keeps the aspect ratio. Never upscales.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }
    let ratio = f64::min(
        f64::from(max_width) / f64::from(width),
        f64::from(max_height) / f64::from(height),
    );
    let scaled = |side: u32| ((f64::from(side) * ratio) as u32).max(1);
    (scaled(width), scaled(height))
}

fn encode_jpeg(frame: &RgbImage, quality: u8) -> image::ImageResult<Vec<u8>> {
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    frame.write_with_encoder(encoder)?;
    Ok(bytes)
}

fn strip_data_url(frame: &str) -> &str {
    match frame.split_once(',') {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => frame,
    }
}

fn resize_encoded(
    frame: &str,
    max_width: u32,
    max_height: u32,
    quality: u8,
) -> anyhow::Result<CapturedFrame> {
    let bytes = STANDARD.decode(strip_data_url(frame).trim())?;
    let image = image::load_from_memory(&bytes)?;

    let (width, height) = image.dimensions();
    let (new_width, new_height) = fit_within(width, height, max_width, max_height);
    let resized: DynamicImage = if (new_width, new_height) == (width, height) {
        image
    } else {
        image.resize_exact(new_width, new_height, FilterType::Triangle)
    };

    let rgb = resized.to_rgb8();
    let encoded = encode_jpeg(&rgb, quality)?;
    tracing::trace!(width, height, new_width, new_height, "Resized frame");

    Ok(CapturedFrame {
        data: STANDARD.encode(encoded),
        width: rgb.width(),
        height: rgb.height(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::testing::FakeVideoSource;

    fn decoded_size(frame: &str) -> (u32, u32) {
        let bytes = STANDARD.decode(frame).expect("base64");
        image::load_from_memory(&bytes).expect("jpeg").dimensions()
    }

    fn jpeg_of(width: u32, height: u32) -> String {
        let frame = RgbImage::from_pixel(width, height, image::Rgb([10, 120, 200]));
        STANDARD.encode(encode_jpeg(&frame, 80).expect("encode"))
    }

    struct BrokenSource;

    impl VideoSource for BrokenSource {
        fn has_enough_data(&self) -> bool {
            true
        }

        fn intrinsic_size(&self) -> Option<FrameSize> {
            Some(FrameSize::new(4, 4))
        }

        fn read_frame(&self, _size: FrameSize) -> anyhow::Result<RgbImage> {
            anyhow::bail!("video element detached")
        }
    }

    #[test]
    fn test_capture_before_data_is_buffered_yields_no_frame() {
        let source = FakeVideoSource::warming_up(Some(FrameSize::new(320, 240)));
        let codec = FrameCodec::default();

        assert!(codec.capture_default(&source).is_none());

        source.set_ready(true);
        assert!(codec.capture_default(&source).is_some());
    }

    #[test]
    fn test_capture_uses_native_size() {
        let source = FakeVideoSource::new(Some(FrameSize::new(320, 180)));
        let frame = FrameCodec::default().capture(&source, 0.8).expect("frame");

        assert_eq!((frame.width, frame.height), (320, 180));
        assert_eq!(decoded_size(&frame.data), (320, 180));
        assert!(!frame.data.starts_with("data:"));
    }

    #[test]
    fn test_capture_falls_back_to_640x480() {
        let source = FakeVideoSource::new(None);
        let frame = FrameCodec::default().capture_default(&source).expect("frame");

        assert_eq!(decoded_size(&frame.data), (640, 480));
    }

    #[test]
    fn test_capture_failure_is_no_frame() {
        assert!(FrameCodec::default().capture(&BrokenSource, 0.8).is_none());
    }

    #[tokio::test]
    async fn test_resize_shrinks_to_bounds() {
        let codec = FrameCodec::default();
        let resized = codec.resize_default(&jpeg_of(640, 480)).await;

        assert_eq!(decoded_size(&resized), (320, 240));
    }

    #[tokio::test]
    async fn test_resize_keeps_aspect_ratio() {
        let codec = FrameCodec::default();
        let resized = codec.resize(&jpeg_of(1024, 128), 256, 240, 0.7).await;

        assert_eq!(decoded_size(&resized), (256, 32));
    }

    #[tokio::test]
    async fn test_resize_never_upscales() {
        let codec = FrameCodec::default();
        let resized = codec.resize(&jpeg_of(100, 50), 320, 240, 0.7).await;

        assert_eq!(decoded_size(&resized), (100, 50));
    }

    #[tokio::test]
    async fn test_resize_accepts_data_url() {
        let codec = FrameCodec::default();
        let frame = format!("data:image/jpeg;base64,{}", jpeg_of(640, 480));

        let resized = codec.resize_default(&frame).await;

        assert_eq!(decoded_size(&resized), (320, 240));
    }

    #[tokio::test]
    async fn test_resize_returns_corrupt_input_unchanged() {
        let codec = FrameCodec::default();

        let not_base64 = "%%% not base64 %%%";
        assert_eq!(codec.resize_default(not_base64).await, not_base64);

        let not_an_image = STANDARD.encode(b"definitely not a jpeg");
        assert_eq!(codec.resize_default(&not_an_image).await, not_an_image);
    }

    #[test]
    fn test_quality_factor_mapping() {
        assert_eq!(jpeg_quality(0.8), 80);
        assert_eq!(jpeg_quality(0.7), 70);
        assert_eq!(jpeg_quality(0.0), 1);
        assert_eq!(jpeg_quality(1.0), 100);
        assert_eq!(jpeg_quality(f64::NAN), 92);
    }

    #[test]
    fn test_out_of_range_quality_uses_default() {
        assert_eq!(jpeg_quality(1.5), 92);
        assert_eq!(jpeg_quality(-0.1), 92);
        assert_eq!(jpeg_quality(f64::INFINITY), 92);
    }

    #[test]
    fn test_fit_within_truncates_and_keeps_minimum() {
        assert_eq!(fit_within(640, 480, 320, 240), (320, 240));
        assert_eq!(fit_within(400, 100, 100, 100), (100, 25));
        assert_eq!(fit_within(8192, 1, 512, 240), (512, 1));
        assert_eq!(fit_within(320, 240, 320, 240), (320, 240));
    }
}
