//! Command-line player: joins or creates a room, logs the game as it
//! happens and leaves cleanly on Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::Notify;

use rpsonline_player::infrastructure::websocket::CONNECTION_LOST_MESSAGE;
use rpsonline_player::ports::{EndpointResolver, StaticEndpoint};
use rpsonline_player::{
    ClientConfig, ClientMessageBuilder, HttpRoomClient, MessageChannel, SessionService,
    TungsteniteTransport,
};
use rpsonline_protocol::{kinds, ServerEvent, WireMessage};

/// rpsonline-player - play Rock Paper Scissors Online from a terminal
#[derive(Debug, Parser)]
#[command(name = "rpsonline-player")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Join this room instead of creating a new one
    #[arg(long, env = "RPS_ROOM_ID")]
    pub room: Option<String>,

    /// Create the room as a game against the AI
    #[arg(long, conflicts_with = "room")]
    pub ai: bool,
}

pub async fn run(cli: Cli, config: ClientConfig) -> Result<()> {
    let endpoint: Arc<dyn EndpointResolver> = Arc::new(StaticEndpoint(config.endpoint.clone()));
    let rooms = HttpRoomClient::for_endpoint(&config.endpoint, config.http_timeout)
        .context("invalid game server endpoint")?;
    tracing::info!(server = %rooms.base_url(), "Using game server");
    let session = SessionService::new(
        Arc::new(rooms),
        endpoint,
        Arc::new(TungsteniteTransport::new()),
        config.channel,
    );

    session
        .check_server()
        .await
        .context("game server unreachable")?;

    let room_id = match cli.room {
        Some(room_id) => {
            let status = session
                .room_status(&room_id)
                .await
                .with_context(|| format!("cannot join room {room_id}"))?;
            if status.is_full() {
                tracing::warn!(room_id = %room_id, "Room is full");
            }
            room_id
        }
        None => session.create_room(cli.ai).await?.room_id,
    };

    let channel = session.channel_for(&room_id);
    let connection_lost = Arc::new(Notify::new());
    register_handlers(&channel, Arc::clone(&connection_lost));

    channel.connect().await?;
    tracing::info!(
        room_id = %channel.room_id(),
        player_id = %channel.player_id(),
        "Joined room"
    );
    channel.send(&ClientMessageBuilder::player_ready());

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for Ctrl-C")?;
            tracing::info!("Leaving room");
        }
        _ = connection_lost.notified() => {
            tracing::error!("Giving up on the game server");
        }
    }

    channel.disconnect();
    Ok(())
}

/// Log every server event; wake `connection_lost` when reconnection gives up.
fn register_handlers(channel: &MessageChannel, connection_lost: Arc<Notify>) {
    for &kind in kinds::SERVER_EVENTS {
        channel.on(kind, move |payload| {
            let message = WireMessage::from_parts(kind, payload.clone());
            match ServerEvent::from_message(&message)? {
                ServerEvent::OpponentFrame { player_id, frame } => {
                    tracing::debug!(player_id = %player_id, bytes = frame.len(), "Opponent frame");
                }
                event => tracing::info!(?event, "Server event"),
            }
            Ok(())
        });
    }

    channel.on(kinds::ERROR, move |payload| {
        if payload.get("message").and_then(|m| m.as_str()) == Some(CONNECTION_LOST_MESSAGE) {
            connection_lost.notify_one();
        }
        Ok(())
    });
}
