//! Room API Port - HTTP boundary for room lifecycle calls.

use rpsonline_protocol::{HealthStatus, RoomCreated, RoomStatus};

use super::error::ApiError;

/// Room management endpoints of the game server.
///
/// Each call is bounded by the client timeout and maps failures to an
/// `ApiError` kind the session setup code can show to the user.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RoomApiPort: Send + Sync {
    /// `POST /create-room`
    async fn create_room(&self, is_ai_game: bool) -> Result<RoomCreated, ApiError>;

    /// `GET /room/{room_id}/status`
    async fn room_status(&self, room_id: &str) -> Result<RoomStatus, ApiError>;

    /// `GET /`
    async fn server_health(&self) -> Result<HealthStatus, ApiError>;
}
