//! RPS Online player client.
//!
//! A resilient real-time message channel to a game room, JPEG frame
//! capture for the video feed, and the room-management HTTP client used
//! during session setup. Host capabilities (transport, camera, endpoint)
//! are injected through the traits in [`ports`].

pub mod application;
pub mod config;
pub mod infrastructure;
pub mod ports;

// Re-export commonly used entrypoints
pub use application::{CameraService, SessionService};
pub use config::ClientConfig;
pub use infrastructure::websocket::{
    ChannelSettings, ChannelStatus, ClientMessageBuilder, HandlerId, MessageChannel,
    TungsteniteTransport,
};
pub use infrastructure::{FrameCodec, HttpRoomClient};
