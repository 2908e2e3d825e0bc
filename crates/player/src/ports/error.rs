//! Error types for port operations.
//!
//! Only two call sites surface errors to their caller: `MessageChannel::connect`
//! and camera acquisition. Room API calls propagate too, since they are
//! one-shot setup steps. Everything else logs and absorbs failures.

use std::time::Duration;

/// Failure of `MessageChannel::connect`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// The transport did not report open within the connect timeout.
    #[error("WebSocket connection timeout after {}ms", .0.as_millis())]
    ConnectionTimeout(Duration),

    /// The transport reported an error before opening.
    #[error("WebSocket transport error: {0}")]
    Transport(String),

    /// The server endpoint could not be turned into a WebSocket URL.
    #[error("Invalid WebSocket endpoint: {0}")]
    InvalidEndpoint(String),
}

impl ChannelError {
    pub fn transport(message: impl ToString) -> Self {
        Self::Transport(message.to_string())
    }

    /// Whether the failure came from the connect deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectionTimeout(_))
    }
}

impl From<TransportError> for ChannelError {
    fn from(error: TransportError) -> Self {
        Self::Transport(error.to_string())
    }
}

/// Failure reported by a transport adapter while opening a link.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Failure of a room-management HTTP call.
///
/// Display strings are user-facing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("Resource not found")]
    NotFound,

    #[error("Server error. Please try again later.")]
    Server,

    #[error("Request timeout. Please check your connection.")]
    Timeout,

    #[error("Network error. Please check your connection.")]
    Network,

    /// Any other non-success status.
    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not match the expected shape.
    #[error("Invalid response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Map a non-success HTTP status to an error kind.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        match status {
            404 => Self::NotFound,
            500 => Self::Server,
            408 => Self::Timeout,
            _ => Self::Status {
                status,
                body: body.into(),
            },
        }
    }
}

/// Failure to acquire a camera stream.
///
/// Display strings are user-facing, one per failure kind so the UI can
/// tell a permission prompt apart from a hardware problem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CameraError {
    #[error("Camera access denied. Please allow camera permissions.")]
    PermissionDenied,

    #[error("No camera found on this device.")]
    NoDevice,

    #[error("Camera is already in use by another application.")]
    DeviceBusy,

    #[error("Camera does not meet the required specifications.")]
    Overconstrained,

    #[error("Camera error: getUserMedia is not supported in this browser")]
    Unsupported,

    #[error("Camera error: {0}")]
    Other(String),
}

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },

    #[error("Missing required setting {0}")]
    Missing(&'static str),
}

impl ConfigError {
    pub fn invalid(key: &'static str, message: impl ToString) -> Self {
        Self::InvalidValue {
            key,
            message: message.to_string(),
        }
    }
}
