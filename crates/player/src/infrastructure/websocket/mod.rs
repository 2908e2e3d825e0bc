//! WebSocket messaging for a game room
//!
//! - `channel`: the resilient per-room `MessageChannel`
//! - `dispatch`: type-keyed handler registry
//! - `reconnect`: bounded linear backoff policy
//! - `desktop`: tokio-tungstenite transport
//! - `message_builder`: outbound game message construction

mod channel;
mod desktop;
mod dispatch;
mod message_builder;
mod reconnect;
mod shared;

pub use channel::{ChannelStatus, MessageChannel};
pub use desktop::TungsteniteTransport;
pub use dispatch::{Handler, HandlerId, HandlerRegistry, HandlerResult};
pub use message_builder::ClientMessageBuilder;
pub use reconnect::{ReconnectPhase, ReconnectPolicy};
pub use shared::{
    ChannelSettings, CONNECTION_LOST_MESSAGE, CONNECT_TIMEOUT, MAX_RECONNECT_ATTEMPTS,
    RECONNECT_BASE_DELAY,
};
