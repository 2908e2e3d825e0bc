//! In-memory transport for channel tests.
//!
//! Each accepted link gets a peer task that records outbound commands,
//! optionally echoes text frames back, and answers a close command with the
//! same code, like a well-behaved server would.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::ports::{
    ReadyState, ReadyStateCell, TransportCommand, TransportError, TransportEvent, TransportLink,
    TransportPort,
};

/// Scripted outcome of one `open` call.
#[derive(Debug, Clone)]
pub enum OpenBehavior {
    Accept,
    Refuse(String),
    /// Never resolve; exercises the connect timeout.
    Hang,
}

struct LoopbackLink {
    events: mpsc::UnboundedSender<TransportEvent>,
    ready: ReadyStateCell,
    sent: Arc<Mutex<Vec<TransportCommand>>>,
}

#[derive(Default)]
struct LoopbackState {
    script: VecDeque<OpenBehavior>,
    echo: bool,
    attempts: Vec<(String, Instant)>,
    links: Vec<LoopbackLink>,
}

/// Transport double. Clones share state.
#[derive(Clone, Default)]
pub struct LoopbackTransport {
    state: Arc<Mutex<LoopbackState>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl LoopbackTransport {
    /// Accepts every open unless scripted otherwise.
    pub fn new() -> Self {
        Self::default()
    }

    /// Like `new`, but every text frame sent is echoed back.
    pub fn echo() -> Self {
        let transport = Self::default();
        lock(&transport.state).echo = true;
        transport
    }

    /// Queue outcomes for the next `open` calls. Unscripted calls accept.
    pub fn script(&self, behaviors: impl IntoIterator<Item = OpenBehavior>) {
        lock(&self.state).script.extend(behaviors);
    }

    /// Number of `open` calls, accepted or not.
    pub fn open_count(&self) -> usize {
        lock(&self.state).attempts.len()
    }

    /// Virtual time of every `open` call.
    pub fn opened_at(&self) -> Vec<Instant> {
        lock(&self.state).attempts.iter().map(|(_, at)| *at).collect()
    }

    pub fn urls(&self) -> Vec<String> {
        lock(&self.state)
            .attempts
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    /// Number of accepted links.
    pub fn link_count(&self) -> usize {
        lock(&self.state).links.len()
    }

    /// Commands received on link `index`, in order.
    pub fn sent(&self, index: usize) -> Vec<TransportCommand> {
        lock(&self.state)
            .links
            .get(index)
            .map(|link| lock(&link.sent).clone())
            .unwrap_or_default()
    }

    /// Text frames received on link `index`.
    pub fn sent_texts(&self, index: usize) -> Vec<String> {
        self.sent(index)
            .into_iter()
            .filter_map(|command| match command {
                TransportCommand::Text(text) => Some(text),
                TransportCommand::Close { .. } => None,
            })
            .collect()
    }

    pub fn ready_state(&self, index: usize) -> Option<ReadyState> {
        lock(&self.state).links.get(index).map(|link| link.ready.get())
    }

    /// Deliver an inbound text frame on link `index`.
    pub fn push_frame(&self, index: usize, text: impl Into<String>) -> bool {
        lock(&self.state)
            .links
            .get(index)
            .is_some_and(|link| link.events.send(TransportEvent::Text(text.into())).is_ok())
    }

    /// Start a server-side close handshake on link `index` without
    /// finishing it.
    pub fn begin_close(&self, index: usize) {
        let state = lock(&self.state);
        if let Some(link) = state.links.get(index) {
            link.ready.set(ReadyState::Closing);
            let _ = link.events.send(TransportEvent::Closing);
        }
    }

    /// Close link `index` from the server side.
    pub fn close(&self, index: usize, code: u16, reason: &str) {
        let state = lock(&self.state);
        if let Some(link) = state.links.get(index) {
            link.ready.set(ReadyState::Closed);
            let _ = link.events.send(TransportEvent::Closed {
                code,
                reason: reason.to_string(),
            });
        }
    }
}

#[async_trait::async_trait]
impl TransportPort for LoopbackTransport {
    async fn open(&self, url: &str) -> Result<TransportLink, TransportError> {
        let (behavior, echo) = {
            let mut state = lock(&self.state);
            state.attempts.push((url.to_string(), Instant::now()));
            let behavior = state.script.pop_front().unwrap_or(OpenBehavior::Accept);
            (behavior, state.echo)
        };

        match behavior {
            OpenBehavior::Refuse(message) => Err(TransportError::Handshake(message)),
            OpenBehavior::Hang => std::future::pending().await,
            OpenBehavior::Accept => {
                let (command_tx, command_rx) = mpsc::unbounded_channel();
                let (event_tx, event_rx) = mpsc::unbounded_channel();
                let ready = ReadyStateCell::new(ReadyState::Open);
                let sent = Arc::new(Mutex::new(Vec::new()));

                tokio::spawn(peer_task(
                    command_rx,
                    event_tx.clone(),
                    ready.clone(),
                    Arc::clone(&sent),
                    echo,
                ));

                lock(&self.state).links.push(LoopbackLink {
                    events: event_tx,
                    ready: ready.clone(),
                    sent,
                });

                Ok(TransportLink {
                    commands: command_tx,
                    events: event_rx,
                    ready_state: ready,
                })
            }
        }
    }
}

async fn peer_task(
    mut commands: mpsc::UnboundedReceiver<TransportCommand>,
    events: mpsc::UnboundedSender<TransportEvent>,
    ready: ReadyStateCell,
    sent: Arc<Mutex<Vec<TransportCommand>>>,
    echo: bool,
) {
    while let Some(command) = commands.recv().await {
        lock(&sent).push(command.clone());
        match command {
            TransportCommand::Text(text) => {
                if echo {
                    let _ = events.send(TransportEvent::Text(text));
                }
            }
            TransportCommand::Close { code, reason } => {
                ready.set(ReadyState::Closing);
                let _ = events.send(TransportEvent::Closing);
                ready.set(ReadyState::Closed);
                let _ = events.send(TransportEvent::Closed { code, reason });
                return;
            }
        }
    }
}
