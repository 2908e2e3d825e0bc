//! Media doubles: a synthetic video source and stoppable tracks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::{Rgb, RgbImage};

use crate::ports::{FrameSize, MediaKind, MediaStream, MediaTrack, VideoSource};

/// Video source producing a solid-colour frame.
pub struct FakeVideoSource {
    ready: AtomicBool,
    intrinsic: Option<FrameSize>,
    colour: Rgb<u8>,
}

impl FakeVideoSource {
    pub fn new(intrinsic: Option<FrameSize>) -> Self {
        Self {
            ready: AtomicBool::new(true),
            intrinsic,
            colour: Rgb([200, 40, 40]),
        }
    }

    /// A source still buffering its first frame.
    pub fn warming_up(intrinsic: Option<FrameSize>) -> Self {
        let source = Self::new(intrinsic);
        source.ready.store(false, Ordering::SeqCst);
        source
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }
}

impl VideoSource for FakeVideoSource {
    fn has_enough_data(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn intrinsic_size(&self) -> Option<FrameSize> {
        self.intrinsic
    }

    fn read_frame(&self, size: FrameSize) -> anyhow::Result<RgbImage> {
        Ok(RgbImage::from_pixel(size.width, size.height, self.colour))
    }
}

/// Track that remembers whether it was stopped.
pub struct FakeTrack {
    kind: MediaKind,
    stopped: AtomicBool,
}

impl FakeTrack {
    pub fn new(kind: MediaKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            stopped: AtomicBool::new(false),
        })
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl MediaTrack for FakeTrack {
    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Stream over a fixed set of tracks.
pub struct FakeStream {
    tracks: Vec<Arc<FakeTrack>>,
}

impl FakeStream {
    pub fn new(tracks: Vec<Arc<FakeTrack>>) -> Arc<Self> {
        Arc::new(Self { tracks })
    }
}

impl MediaStream for FakeStream {
    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        self.tracks
            .iter()
            .map(|track| Arc::clone(track) as Arc<dyn MediaTrack>)
            .collect()
    }
}
