//! Data Transfer Objects (DTOs)
//!
//! Wire-format bodies of the room-management HTTP endpoints.

use serde::{Deserialize, Serialize};

/// Body of `POST /create-room`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    pub is_ai_game: bool,
}

/// Response of `POST /create-room`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomCreated {
    pub room_id: String,
}

/// Response of `GET /room/{room_id}/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomStatus {
    pub room_id: String,
    pub players_count: u32,
    pub max_players: u32,
    /// Server-side game state (`waiting`, `playing`, ...)
    pub game_state: String,
}

impl RoomStatus {
    pub fn is_full(&self) -> bool {
        self.players_count >= self.max_players
    }
}

/// Response of `GET /`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_status_from_server_json() {
        let status: RoomStatus = serde_json::from_str(
            r#"{"room_id":"AB12CD34","players_count":2,"max_players":2,"game_state":"playing"}"#,
        )
        .expect("valid status");

        assert_eq!(status.room_id, "AB12CD34");
        assert!(status.is_full());
    }

    #[test]
    fn test_create_room_request_body() {
        let body = serde_json::to_string(&CreateRoomRequest { is_ai_game: true }).expect("body");
        assert_eq!(body, r#"{"is_ai_game":true}"#);
    }
}
