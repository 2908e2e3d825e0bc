//! Transport Port - the socket capability behind a `MessageChannel`.
//!
//! A transport opens one link per call. The link is a pair of unbounded
//! queues plus a shared ready-state cell, so the channel never touches the
//! concrete socket type and tests can substitute an in-memory transport.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use super::error::TransportError;

/// Close code for an intentional, non-erroneous closure.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close code reported when the peer closed without a status code.
pub const NO_STATUS_RECEIVED: u16 = 1005;

/// Close code reported when the link dropped without a close handshake.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Reason sent with a client-initiated normal closure.
pub const CLIENT_CLOSE_REASON: &str = "Client disconnecting";

/// Socket-level ready state, as reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ReadyState {
    /// Convert to u8 for atomic storage.
    pub fn to_u8(self) -> u8 {
        match self {
            ReadyState::Connecting => 0,
            ReadyState::Open => 1,
            ReadyState::Closing => 2,
            ReadyState::Closed => 3,
        }
    }

    /// Convert from u8 (atomic storage).
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => ReadyState::Connecting,
            1 => ReadyState::Open,
            2 => ReadyState::Closing,
            _ => ReadyState::Closed,
        }
    }

    /// Upper-case label (`CONNECTING`, `OPEN`, `CLOSING`, `CLOSED`).
    pub fn as_str(self) -> &'static str {
        match self {
            ReadyState::Connecting => "CONNECTING",
            ReadyState::Open => "OPEN",
            ReadyState::Closing => "CLOSING",
            ReadyState::Closed => "CLOSED",
        }
    }
}

impl std::fmt::Display for ReadyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ready state shared between a transport adapter and the channel.
#[derive(Debug, Clone)]
pub struct ReadyStateCell {
    state: Arc<AtomicU8>,
}

impl ReadyStateCell {
    pub fn new(initial: ReadyState) -> Self {
        Self {
            state: Arc::new(AtomicU8::new(initial.to_u8())),
        }
    }

    pub fn get(&self) -> ReadyState {
        ReadyState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn set(&self, state: ReadyState) {
        self.state.store(state.to_u8(), Ordering::SeqCst);
    }
}

/// Command from the channel to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    /// Transmit one text frame.
    Text(String),
    /// Start the close handshake.
    Close { code: u16, reason: String },
}

/// Event from the transport to the channel, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One inbound text frame.
    Text(String),
    /// The close handshake has started.
    Closing,
    /// The link is gone. Always the last event of a link.
    Closed { code: u16, reason: String },
}

/// An open transport link.
#[derive(Debug)]
pub struct TransportLink {
    pub commands: mpsc::UnboundedSender<TransportCommand>,
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
    pub ready_state: ReadyStateCell,
}

/// Opens transport links.
///
/// `open` resolves once the link is open or fails with the error the
/// transport reported before opening. Deadlines are enforced by the caller.
#[async_trait::async_trait]
pub trait TransportPort: Send + Sync {
    async fn open(&self, url: &str) -> Result<TransportLink, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_state_roundtrip() {
        let states = [
            ReadyState::Connecting,
            ReadyState::Open,
            ReadyState::Closing,
            ReadyState::Closed,
        ];

        for state in states {
            assert_eq!(ReadyState::from_u8(state.to_u8()), state);
        }
    }

    #[test]
    fn test_cell_is_shared_between_clones() {
        let cell = ReadyStateCell::new(ReadyState::Connecting);
        let observer = cell.clone();

        cell.set(ReadyState::Open);
        assert_eq!(observer.get(), ReadyState::Open);
        assert_eq!(observer.get().to_string(), "OPEN");
    }
}
