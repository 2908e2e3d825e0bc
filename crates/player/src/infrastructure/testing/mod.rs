//! Test doubles for the player ports.

mod loopback_transport;
mod media;

pub use loopback_transport::{LoopbackTransport, OpenBehavior};
pub use media::{FakeStream, FakeTrack, FakeVideoSource};

/// Yield to other tasks until `condition` holds, giving up after a bounded
/// number of turns.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..1_000 {
        if condition() {
            return true;
        }
        tokio::task::yield_now().await;
    }
    condition()
}
