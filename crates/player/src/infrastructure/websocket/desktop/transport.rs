//! Desktop WebSocket transport using tokio-tungstenite

use std::borrow::Cow;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::ports::{
    ReadyState, ReadyStateCell, TransportCommand, TransportError, TransportEvent, TransportLink,
    TransportPort, ABNORMAL_CLOSURE, NO_STATUS_RECEIVED,
};

/// WebSocket transport backed by tokio-tungstenite.
///
/// Each opened link runs a writer task fed by the link's command queue and a
/// reader task that forwards text frames and reports the close code.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteTransport;

impl TungsteniteTransport {
    pub fn new() -> Self {
        Self
    }
}

fn map_connect_error(error: WsError) -> TransportError {
    match error {
        WsError::Io(e) => TransportError::Io(e.to_string()),
        other => TransportError::Handshake(other.to_string()),
    }
}

#[async_trait::async_trait]
impl TransportPort for TungsteniteTransport {
    async fn open(&self, url: &str) -> Result<TransportLink, TransportError> {
        let (ws_stream, _) = connect_async(url).await.map_err(map_connect_error)?;
        tracing::debug!(url = %url, "WebSocket handshake complete");

        let (mut write, mut read) = ws_stream.split();
        let ready_state = ReadyStateCell::new(ReadyState::Open);
        let (command_tx, mut command_rx) = mpsc::unbounded_channel::<TransportCommand>();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<TransportEvent>();

        let writer_state = ready_state.clone();
        tokio::spawn(async move {
            while let Some(command) = command_rx.recv().await {
                match command {
                    TransportCommand::Text(text) => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            tracing::error!(error = %e, "Failed to send WebSocket frame");
                            break;
                        }
                    }
                    TransportCommand::Close { code, reason } => {
                        writer_state.set(ReadyState::Closing);
                        let frame = CloseFrame {
                            code: CloseCode::from(code),
                            reason: Cow::Owned(reason),
                        };
                        if let Err(e) = write.send(Message::Close(Some(frame))).await {
                            tracing::debug!(error = %e, "Close frame not delivered");
                        }
                        return;
                    }
                }
            }
            // Link dropped without an explicit close
            let _ = write.close().await;
        });

        let reader_state = ready_state.clone();
        tokio::spawn(async move {
            let mut close: Option<(u16, String)> = None;

            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        if event_tx.send(TransportEvent::Text(text)).is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        reader_state.set(ReadyState::Closing);
                        let _ = event_tx.send(TransportEvent::Closing);
                        close = Some(frame.map_or((NO_STATUS_RECEIVED, String::new()), |f| {
                            (u16::from(f.code), f.reason.into_owned())
                        }));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "WebSocket read error");
                        break;
                    }
                }
            }

            reader_state.set(ReadyState::Closed);
            let (code, reason) = close.unwrap_or((ABNORMAL_CLOSURE, String::new()));
            let _ = event_tx.send(TransportEvent::Closed { code, reason });
        });

        Ok(TransportLink {
            commands: command_tx,
            events: event_rx,
            ready_state,
        })
    }
}
