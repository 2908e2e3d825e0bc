//! Session service for setting up a game session
//!
//! This service handles:
//! - Checking the game server is reachable
//! - Creating rooms and reading their status
//! - Handing out an unconnected `MessageChannel` for a room, bound to a
//!   freshly generated player id

use std::sync::Arc;

use rand::Rng;

use rpsonline_protocol::{HealthStatus, RoomCreated, RoomStatus};

use crate::infrastructure::websocket::{ChannelSettings, MessageChannel};
use crate::ports::{ApiError, EndpointResolver, RoomApiPort, TransportPort};

const PLAYER_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const PLAYER_ID_SUFFIX_LEN: usize = 9;

/// Generate a session-unique player id: `player_<unix millis>_<9 base36 chars>`.
pub fn generate_player_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..PLAYER_ID_SUFFIX_LEN)
        .map(|_| char::from(PLAYER_ID_ALPHABET[rng.gen_range(0..PLAYER_ID_ALPHABET.len())]))
        .collect();
    format!("player_{}_{}", chrono::Utc::now().timestamp_millis(), suffix)
}

/// Session service for room setup.
///
/// Room calls are one-shot setup steps, so their `ApiError`s propagate to
/// the caller unchanged.
#[derive(Clone)]
pub struct SessionService {
    rooms: Arc<dyn RoomApiPort>,
    endpoint: Arc<dyn EndpointResolver>,
    transport: Arc<dyn TransportPort>,
    settings: ChannelSettings,
}

impl SessionService {
    pub fn new(
        rooms: Arc<dyn RoomApiPort>,
        endpoint: Arc<dyn EndpointResolver>,
        transport: Arc<dyn TransportPort>,
        settings: ChannelSettings,
    ) -> Self {
        Self {
            rooms,
            endpoint,
            transport,
            settings,
        }
    }

    pub async fn check_server(&self) -> Result<HealthStatus, ApiError> {
        let health = self.rooms.server_health().await?;
        tracing::info!(message = %health.message, "Game server reachable");
        Ok(health)
    }

    pub async fn create_room(&self, is_ai_game: bool) -> Result<RoomCreated, ApiError> {
        let created = self.rooms.create_room(is_ai_game).await?;
        tracing::info!(room_id = %created.room_id, is_ai_game, "Room created");
        Ok(created)
    }

    pub async fn room_status(&self, room_id: &str) -> Result<RoomStatus, ApiError> {
        self.rooms.room_status(room_id).await
    }

    /// A new, not yet connected channel to `room_id` under a fresh player id.
    pub fn channel_for(&self, room_id: &str) -> MessageChannel {
        let player_id = generate_player_id();
        tracing::debug!(room_id = %room_id, player_id = %player_id, "Creating message channel");
        MessageChannel::with_settings(
            room_id,
            player_id,
            Arc::clone(&self.endpoint),
            Arc::clone(&self.transport),
            self.settings,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::testing::LoopbackTransport;
    use crate::infrastructure::websocket::ChannelStatus;
    use crate::ports::room_api::MockRoomApiPort;
    use crate::ports::{ServerEndpoint, StaticEndpoint};
    use mockall::predicate::eq;

    fn service(rooms: MockRoomApiPort, transport: &LoopbackTransport) -> SessionService {
        SessionService::new(
            Arc::new(rooms),
            Arc::new(StaticEndpoint(ServerEndpoint::development())),
            Arc::new(transport.clone()),
            ChannelSettings::default(),
        )
    }

    #[test]
    fn test_player_id_format() {
        let id = generate_player_id();
        let parts: Vec<&str> = id.split('_').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "player");
        assert!(parts[1].parse::<i64>().expect("millis") > 0);
        assert_eq!(parts[2].len(), 9);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_player_ids_differ() {
        assert_ne!(generate_player_id(), generate_player_id());
    }

    #[tokio::test]
    async fn test_create_room_forwards_flag() {
        let mut rooms = MockRoomApiPort::new();
        rooms
            .expect_create_room()
            .with(eq(true))
            .times(1)
            .returning(|_| {
                Ok(RoomCreated {
                    room_id: "AB12CD34".to_string(),
                })
            });

        let created = service(rooms, &LoopbackTransport::new())
            .create_room(true)
            .await
            .expect("room");

        assert_eq!(created.room_id, "AB12CD34");
    }

    #[tokio::test]
    async fn test_room_errors_propagate() {
        let mut rooms = MockRoomApiPort::new();
        rooms
            .expect_room_status()
            .returning(|_| Err(ApiError::NotFound));
        rooms
            .expect_server_health()
            .returning(|| Err(ApiError::Network));

        let service = service(rooms, &LoopbackTransport::new());

        assert_eq!(service.room_status("NOPE").await, Err(ApiError::NotFound));
        assert_eq!(service.check_server().await, Err(ApiError::Network));
    }

    #[tokio::test]
    async fn test_channel_for_binds_room_and_fresh_player() {
        let transport = LoopbackTransport::new();
        let service = service(MockRoomApiPort::new(), &transport);

        let channel = service.channel_for("R1");
        assert_eq!(channel.room_id(), "R1");
        assert!(channel.player_id().starts_with("player_"));
        assert_eq!(channel.status(), ChannelStatus::Disconnected);
        assert_eq!(transport.open_count(), 0);

        channel.connect().await.expect("connect");
        assert_eq!(
            transport.urls(),
            vec![format!("ws://localhost:8000/ws/R1/{}", channel.player_id())]
        );
    }
}
