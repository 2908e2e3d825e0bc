//! Resilient message channel to one game room.
//!
//! A `MessageChannel` owns at most one transport link at a time. Inbound
//! frames are parsed and dispatched to handlers in arrival order by a
//! per-link reader task. Abnormal closures start a bounded, linearly backed
//! off retry sequence driven by a single timer task.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use rpsonline_protocol::{kinds, Payload, WireMessage};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::dispatch::{Handler, HandlerId, HandlerRegistry, HandlerResult};
use super::reconnect::{ReconnectPhase, ReconnectPolicy};
use super::shared::{parse_frame, ChannelSettings, CONNECTION_LOST_MESSAGE};
use crate::ports::{
    ChannelError, EndpointResolver, ReadyState, ReadyStateCell, TransportCommand,
    TransportEvent, TransportLink, TransportPort, ABNORMAL_CLOSURE, CLIENT_CLOSE_REASON,
    NORMAL_CLOSURE,
};

/// Connection status of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Disconnected,
    Connecting,
    Open,
    /// The peer started the close handshake.
    Closing,
}

struct ActiveLink {
    id: u64,
    commands: mpsc::UnboundedSender<TransportCommand>,
    ready_state: ReadyStateCell,
}

struct ChannelState {
    link: Option<ActiveLink>,
    next_link_id: u64,
    reconnect: ReconnectPolicy,
    retry_task: Option<JoinHandle<()>>,
    /// Set by `disconnect`, cleared by `connect`.
    intentional_close: bool,
}

struct ChannelInner {
    room_id: String,
    player_id: String,
    endpoint: Arc<dyn EndpointResolver>,
    transport: Arc<dyn TransportPort>,
    settings: ChannelSettings,
    handlers: HandlerRegistry,
    state: Mutex<ChannelState>,
    status: watch::Sender<ChannelStatus>,
}

enum ConnectStart {
    Started,
    AlreadyOpen,
    InFlight,
}

/// Real-time connection to one room for one player.
///
/// Cheap to clone; clones drive the same connection.
#[derive(Clone)]
pub struct MessageChannel {
    inner: Arc<ChannelInner>,
}

impl MessageChannel {
    pub fn new(
        room_id: impl Into<String>,
        player_id: impl Into<String>,
        endpoint: Arc<dyn EndpointResolver>,
        transport: Arc<dyn TransportPort>,
    ) -> Self {
        Self::with_settings(
            room_id,
            player_id,
            endpoint,
            transport,
            ChannelSettings::default(),
        )
    }

    pub fn with_settings(
        room_id: impl Into<String>,
        player_id: impl Into<String>,
        endpoint: Arc<dyn EndpointResolver>,
        transport: Arc<dyn TransportPort>,
        settings: ChannelSettings,
    ) -> Self {
        let (status, _) = watch::channel(ChannelStatus::Disconnected);
        Self {
            inner: Arc::new(ChannelInner {
                room_id: room_id.into(),
                player_id: player_id.into(),
                endpoint,
                transport,
                settings,
                handlers: HandlerRegistry::new(),
                state: Mutex::new(ChannelState {
                    link: None,
                    next_link_id: 0,
                    reconnect: ReconnectPolicy::new(
                        settings.max_reconnect_attempts,
                        settings.reconnect_base_delay,
                    ),
                    retry_task: None,
                    intentional_close: false,
                }),
                status,
            }),
        }
    }

    pub fn room_id(&self) -> &str {
        &self.inner.room_id
    }

    pub fn player_id(&self) -> &str {
        &self.inner.player_id
    }

    pub fn status(&self) -> ChannelStatus {
        self.inner.current_status()
    }

    /// Watch status transitions.
    pub fn subscribe_status(&self) -> watch::Receiver<ChannelStatus> {
        self.inner.status.subscribe()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.lock_state().reconnect.attempts()
    }

    pub fn reconnect_phase(&self) -> ReconnectPhase {
        self.inner.lock_state().reconnect.phase()
    }

    /// Ready state of the current transport link.
    ///
    /// Without a link this is `Connecting` while an open is in flight and
    /// `Closed` otherwise.
    pub fn connection_state(&self) -> ReadyState {
        let state = self.inner.lock_state();
        match &state.link {
            Some(link) => link.ready_state.get(),
            None if self.inner.current_status() == ChannelStatus::Connecting => {
                ReadyState::Connecting
            }
            None => ReadyState::Closed,
        }
    }

    /// Open the connection.
    ///
    /// Resolves once the transport reports open. Fails with
    /// `ConnectionTimeout` if that takes longer than the connect timeout, or
    /// with `Transport` if the transport fails first. Resolves immediately
    /// when already open; while another attempt is in flight, shares its
    /// outcome. Clears a previous `disconnect`.
    pub async fn connect(&self) -> Result<(), ChannelError> {
        self.inner.lock_state().intentional_close = false;
        self.inner.open().await
    }

    /// Close the connection with a normal closure and stop reconnecting.
    ///
    /// The status is `Disconnected` as soon as this returns; the close
    /// handshake finishes in the background.
    pub fn disconnect(&self) {
        let mut state = self.inner.lock_state();
        state.intentional_close = true;
        state.reconnect.cancel();
        if let Some(task) = state.retry_task.take() {
            task.abort();
        }
        if let Some(link) = state.link.take() {
            tracing::info!(room_id = %self.inner.room_id, "Disconnecting WebSocket");
            let _ = link.commands.send(TransportCommand::Close {
                code: NORMAL_CLOSURE,
                reason: CLIENT_CLOSE_REASON.to_string(),
            });
        }
        self.inner.set_status(ChannelStatus::Disconnected);
    }

    /// Send one message.
    ///
    /// Does nothing (beyond a warning) unless the channel and its transport
    /// are both open. Never fails; returns whether the frame was handed to
    /// the transport.
    pub fn send(&self, message: &WireMessage) -> bool {
        let commands = {
            let state = self.inner.lock_state();
            match &state.link {
                Some(link)
                    if self.inner.current_status() == ChannelStatus::Open
                        && link.ready_state.get() == ReadyState::Open =>
                {
                    Some(link.commands.clone())
                }
                _ => None,
            }
        };

        let Some(commands) = commands else {
            tracing::warn!(kind = %message.kind, "WebSocket not connected, message not sent");
            return false;
        };

        let text = match message.to_json() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(kind = %message.kind, error = %e, "Error sending WebSocket message");
                return false;
            }
        };

        if commands.send(TransportCommand::Text(text)).is_err() {
            tracing::warn!(kind = %message.kind, "Transport closed, message not sent");
            return false;
        }

        // Video frames are too frequent to log at debug level
        if message.kind == kinds::VIDEO_FRAME {
            tracing::trace!(kind = %message.kind, "Sent WebSocket message");
        } else {
            tracing::debug!(kind = %message.kind, "Sent WebSocket message");
        }
        true
    }

    /// Send `payload` under `kind`. The payload must serialize to a JSON
    /// object (or unit); anything else is logged and dropped.
    pub fn send_serialized<T: Serialize>(&self, kind: &str, payload: &T) -> bool {
        match serde_json::to_value(payload) {
            Ok(serde_json::Value::Object(fields)) => {
                self.send(&WireMessage::from_parts(kind, fields))
            }
            Ok(serde_json::Value::Null) => self.send(&WireMessage::new(kind)),
            Ok(_) => {
                tracing::error!(kind = %kind, "Message payload is not a JSON object, not sent");
                false
            }
            Err(e) => {
                tracing::error!(kind = %kind, error = %e, "Error serializing WebSocket message");
                false
            }
        }
    }

    /// Register a handler for messages of type `kind`.
    pub fn on<F>(&self, kind: impl Into<String>, handler: F) -> HandlerId
    where
        F: Fn(&Payload) -> HandlerResult + Send + Sync + 'static,
    {
        self.inner.handlers.on(kind, handler)
    }

    /// Register a shared handler; registering it twice runs it twice.
    pub fn on_shared(&self, kind: impl Into<String>, handler: Arc<Handler>) -> HandlerId {
        self.inner.handlers.on_shared(kind, handler)
    }

    /// Remove one registration. Unknown registrations are ignored.
    pub fn off(&self, kind: &str, id: HandlerId) -> bool {
        self.inner.handlers.off(kind, id)
    }

    pub fn handler_count(&self, kind: &str) -> usize {
        self.inner.handlers.handler_count(kind)
    }
}

impl ChannelInner {
    fn lock_state(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_status(&self) -> ChannelStatus {
        *self.status.borrow()
    }

    fn set_status(&self, status: ChannelStatus) {
        self.status.send_replace(status);
    }

    fn begin_connect(&self) -> ConnectStart {
        let state = self.lock_state();
        match self.current_status() {
            ChannelStatus::Open if state.link.is_some() => ConnectStart::AlreadyOpen,
            ChannelStatus::Connecting => ConnectStart::InFlight,
            _ => {
                self.set_status(ChannelStatus::Connecting);
                ConnectStart::Started
            }
        }
    }

    async fn open(self: &Arc<Self>) -> Result<(), ChannelError> {
        match self.begin_connect() {
            ConnectStart::AlreadyOpen => return Ok(()),
            ConnectStart::InFlight => return self.await_pending_open().await,
            ConnectStart::Started => {}
        }

        let url = match self
            .endpoint
            .endpoint()
            .websocket_url(&self.room_id, &self.player_id)
        {
            Ok(url) => url,
            Err(e) => {
                self.abandon_connect();
                return Err(ChannelError::InvalidEndpoint(e.to_string()));
            }
        };

        tracing::info!(url = %url, "Connecting to WebSocket");

        let timeout = self.settings.connect_timeout;
        let link = match tokio::time::timeout(timeout, self.transport.open(url.as_str())).await {
            Ok(Ok(link)) => link,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "WebSocket error");
                self.abandon_connect();
                return Err(e.into());
            }
            Err(_) => {
                tracing::error!(timeout_ms = timeout.as_millis() as u64, "WebSocket connection timeout");
                self.abandon_connect();
                return Err(ChannelError::ConnectionTimeout(timeout));
            }
        };

        self.install(link)
    }

    async fn await_pending_open(&self) -> Result<(), ChannelError> {
        let mut status = self.status.subscribe();
        loop {
            let current = *status.borrow_and_update();
            match current {
                ChannelStatus::Connecting => {}
                ChannelStatus::Open => return Ok(()),
                ChannelStatus::Disconnected | ChannelStatus::Closing => {
                    return Err(ChannelError::transport(
                        "concurrent connection attempt failed",
                    ));
                }
            }
            if status.changed().await.is_err() {
                return Err(ChannelError::transport("channel dropped"));
            }
        }
    }

    fn abandon_connect(&self) {
        let _state = self.lock_state();
        if self.current_status() == ChannelStatus::Connecting {
            self.set_status(ChannelStatus::Disconnected);
        }
    }

    /// Adopt a freshly opened link and start its reader.
    fn install(self: &Arc<Self>, link: TransportLink) -> Result<(), ChannelError> {
        let TransportLink {
            commands,
            events,
            ready_state,
        } = link;

        let mut state = self.lock_state();
        if state.intentional_close {
            let _ = commands.send(TransportCommand::Close {
                code: NORMAL_CLOSURE,
                reason: CLIENT_CLOSE_REASON.to_string(),
            });
            self.set_status(ChannelStatus::Disconnected);
            return Err(ChannelError::transport(
                "connection closed by client before open",
            ));
        }

        state.next_link_id += 1;
        let id = state.next_link_id;

        state.reconnect.reset();
        // A manual connect may win the race against a pending retry timer.
        if let Some(task) = state.retry_task.take() {
            task.abort();
        }

        tokio::spawn(read_loop(Arc::downgrade(self), id, events));
        state.link = Some(ActiveLink {
            id,
            commands,
            ready_state,
        });
        self.set_status(ChannelStatus::Open);
        drop(state);

        tracing::info!(
            room_id = %self.room_id,
            player_id = %self.player_id,
            "WebSocket connected"
        );
        Ok(())
    }

    fn is_current(&self, link_id: u64) -> bool {
        self.lock_state()
            .link
            .as_ref()
            .is_some_and(|link| link.id == link_id)
    }

    fn handle_frame(&self, text: &str) {
        match parse_frame(text) {
            Ok(message) => {
                tracing::debug!(kind = %message.kind, "Received WebSocket message");
                self.handlers.dispatch(&message.kind, message.payload());
            }
            Err(e) => {
                tracing::error!(error = %e, "Error parsing WebSocket message");
            }
        }
    }

    fn handle_closing(&self, link_id: u64) {
        let state = self.lock_state();
        let current = state.link.as_ref().is_some_and(|link| link.id == link_id);
        if current && self.current_status() == ChannelStatus::Open {
            self.set_status(ChannelStatus::Closing);
        }
    }

    fn handle_close(self: &Arc<Self>, link_id: u64, code: u16, reason: &str) {
        let mut state = self.lock_state();
        if !state.link.as_ref().is_some_and(|link| link.id == link_id) {
            return;
        }

        tracing::info!(code, reason = %reason, "WebSocket disconnected");
        state.link = None;

        // A connect started during the close handshake owns the status now
        if self.current_status() == ChannelStatus::Connecting {
            return;
        }
        self.set_status(ChannelStatus::Disconnected);

        if state.reconnect.should_retry(code) {
            self.schedule_reconnect(&mut state);
        } else if code != NORMAL_CLOSURE && state.reconnect.is_exhausted() {
            // No attempts configured; give up right away
            let _ = state.reconnect.next_delay_and_advance();
            drop(state);
            tracing::error!("Max reconnection attempts reached");
            self.emit_connection_lost();
        }
    }

    fn schedule_reconnect(self: &Arc<Self>, state: &mut ChannelState) {
        let Some(delay) = state.reconnect.next_delay_and_advance() else {
            return;
        };
        tracing::info!(
            attempt = state.reconnect.attempts(),
            max_attempts = state.reconnect.max_attempts(),
            delay_ms = delay.as_millis() as u64,
            "Attempting to reconnect"
        );
        state.retry_task = Some(tokio::spawn(reconnect_loop(Arc::downgrade(self), delay)));
    }

    /// Report exhaustion through the normal dispatch path.
    fn emit_connection_lost(&self) {
        let message = WireMessage::new(kinds::ERROR).with("message", CONNECTION_LOST_MESSAGE);
        self.handlers.dispatch(&message.kind, message.payload());
    }
}

async fn read_loop(
    channel: Weak<ChannelInner>,
    link_id: u64,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(inner) = channel.upgrade() else {
            return;
        };
        if !inner.is_current(link_id) {
            tracing::debug!(link_id, "Link replaced, dropping remaining events");
            return;
        }

        match event {
            TransportEvent::Text(text) => inner.handle_frame(&text),
            TransportEvent::Closing => inner.handle_closing(link_id),
            TransportEvent::Closed { code, reason } => {
                inner.handle_close(link_id, code, &reason);
                return;
            }
        }
    }

    // Event stream ended without a close report
    if let Some(inner) = channel.upgrade() {
        inner.handle_close(link_id, ABNORMAL_CLOSURE, "transport dropped");
    }
}

/// The single retry timer of a channel.
///
/// Loops instead of recursing: each failed attempt consults the policy for
/// the next delay until it runs out, then raises the synthetic error event.
async fn reconnect_loop(channel: Weak<ChannelInner>, first_delay: Duration) {
    let mut delay = first_delay;
    loop {
        tokio::time::sleep(delay).await;

        let Some(inner) = channel.upgrade() else {
            return;
        };

        let (cancelled, attempt) = {
            let mut state = inner.lock_state();
            if state.intentional_close {
                state.reconnect.cancel();
            }
            (state.intentional_close, state.reconnect.attempts())
        };
        if cancelled {
            tracing::info!("Reconnection cancelled - intentional disconnect");
            return;
        }

        match inner.open().await {
            Ok(()) => {
                tracing::info!(attempt, "Reconnected successfully");
                return;
            }
            Err(e) => {
                tracing::warn!(attempt, error = %e, "Reconnection failed");
            }
        }

        let next = {
            let mut state = inner.lock_state();
            if state.intentional_close {
                state.reconnect.cancel();
                return;
            }
            let next = state.reconnect.next_delay_and_advance();
            if next.is_some() {
                tracing::info!(
                    attempt = state.reconnect.attempts(),
                    max_attempts = state.reconnect.max_attempts(),
                    "Attempting to reconnect"
                );
            }
            next
        };

        match next {
            Some(next_delay) => delay = next_delay,
            None => {
                tracing::error!("Max reconnection attempts reached");
                inner.emit_connection_lost();
                return;
            }
        }
    }
}
