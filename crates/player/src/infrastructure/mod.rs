pub mod frame_codec;
pub mod http_client;
pub mod websocket;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use frame_codec::{CapturedFrame, CodecSettings, FrameCodec};
pub use http_client::HttpRoomClient;
