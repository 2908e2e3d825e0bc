//! Capability traits the player layer depends on.
//!
//! Adapters in `infrastructure` implement these against real sockets, HTTP
//! and images; tests substitute in-memory doubles.

pub mod endpoint;
pub mod error;
pub mod media;
pub mod room_api;
pub mod transport;

pub use endpoint::{EndpointResolver, ServerEndpoint, StaticEndpoint};
pub use error::{ApiError, CameraError, ChannelError, ConfigError, TransportError};
pub use media::{
    DeviceSelector, FacingMode, FrameSize, MediaConstraints, MediaDeviceInfo, MediaDevicesPort,
    MediaFailure, MediaKind, MediaStream, MediaTrack, Range, VideoConstraints, VideoSource,
};
pub use room_api::RoomApiPort;
pub use transport::{
    ReadyState, ReadyStateCell, TransportCommand, TransportEvent, TransportLink, TransportPort,
    ABNORMAL_CLOSURE, CLIENT_CLOSE_REASON, NORMAL_CLOSURE, NO_STATUS_RECEIVED,
};
