//! Shared constants and helpers for the message channel.

use std::time::Duration;

use rpsonline_protocol::WireMessage;

// Connection defaults
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;
pub const RECONNECT_BASE_DELAY: Duration = Duration::from_millis(1_000);

/// Message of the synthetic `error` event raised when reconnection gives up.
pub const CONNECTION_LOST_MESSAGE: &str = "Connection lost. Please refresh the page.";

/// Tunables of a `MessageChannel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSettings {
    /// How long `connect` waits for the transport to open.
    pub connect_timeout: Duration,
    pub max_reconnect_attempts: u32,
    /// Attempt `n` waits `n * reconnect_base_delay`.
    pub reconnect_base_delay: Duration,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            connect_timeout: CONNECT_TIMEOUT,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
            reconnect_base_delay: RECONNECT_BASE_DELAY,
        }
    }
}

/// Parse one inbound text frame.
pub fn parse_frame(text: &str) -> Result<WireMessage, serde_json::Error> {
    WireMessage::from_json(text)
}
