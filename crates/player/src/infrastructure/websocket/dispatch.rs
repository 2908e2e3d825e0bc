//! Handler registry for inbound messages.
//!
//! Maps a message-type discriminator to an ordered list of callbacks.
//! Dispatch is synchronous and sequential: every handler registered for the
//! type runs once, in registration order, and a failing handler never stops
//! the ones after it.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rpsonline_protocol::Payload;

/// What a handler returns. Errors are logged, never propagated.
pub type HandlerResult = anyhow::Result<()>;

/// A registered message handler.
pub type Handler = dyn Fn(&Payload) -> HandlerResult + Send + Sync;

/// Stable identity of one registration, used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    handlers: HashMap<String, Vec<(HandlerId, Arc<Handler>)>>,
}

/// Observer registry keyed by message type.
///
/// Cheap to clone; clones share the same registrations.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a handler for `kind`.
    pub fn on<F>(&self, kind: impl Into<String>, handler: F) -> HandlerId
    where
        F: Fn(&Payload) -> HandlerResult + Send + Sync + 'static,
    {
        self.on_shared(kind, Arc::new(handler))
    }

    /// Register an already shared handler.
    ///
    /// Registering the same handler twice yields two registrations, and it
    /// runs twice per matching message.
    pub fn on_shared(&self, kind: impl Into<String>, handler: Arc<Handler>) -> HandlerId {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = HandlerId(inner.next_id);
        inner
            .handlers
            .entry(kind.into())
            .or_default()
            .push((id, handler));
        id
    }

    /// Remove one registration. Returns false if it was not registered.
    pub fn off(&self, kind: &str, id: HandlerId) -> bool {
        let mut inner = self.lock();
        let Some(list) = inner.handlers.get_mut(kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        let removed = list.len() != before;
        if list.is_empty() {
            inner.handlers.remove(kind);
        }
        removed
    }

    pub fn handler_count(&self, kind: &str) -> usize {
        self.lock().handlers.get(kind).map_or(0, Vec::len)
    }

    /// Deliver `payload` to every handler registered for `kind`.
    ///
    /// Handlers run outside the registry lock, so they may register or
    /// remove handlers themselves; such changes apply from the next message.
    /// Returns the number of handlers invoked. No handlers is not an error.
    pub fn dispatch(&self, kind: &str, payload: &Payload) -> usize {
        let snapshot: Vec<Arc<Handler>> = match self.lock().handlers.get(kind) {
            Some(list) => list.iter().map(|(_, handler)| Arc::clone(handler)).collect(),
            None => return 0,
        };

        for handler in &snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler(payload))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!(kind = %kind, error = %e, "Error in event handler");
                }
                Err(panic) => {
                    tracing::error!(
                        kind = %kind,
                        panic = %panic_message(panic.as_ref()),
                        "Event handler panicked"
                    );
                }
            }
        }

        snapshot.len()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn payload(value: serde_json::Value) -> Payload {
        match value {
            serde_json::Value::Object(map) => map,
            _ => Payload::new(),
        }
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let registry = HandlerRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for n in 1..=3 {
            let order = Arc::clone(&order);
            registry.on("state", move |_| {
                order.lock().expect("order lock").push(n);
                Ok(())
            });
        }

        assert_eq!(registry.dispatch("state", &payload(json!({"turn": 1}))), 3);
        assert_eq!(*order.lock().expect("order lock"), vec![1, 2, 3]);
    }

    #[test]
    fn test_same_handler_registered_twice_runs_twice() {
        let registry = HandlerRegistry::new();
        let count = Arc::new(AtomicU32::new(0));

        let count_clone = Arc::clone(&count);
        let handler: Arc<Handler> = Arc::new(move |_: &Payload| {
            count_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        registry.on_shared("move", Arc::clone(&handler));
        registry.on_shared("move", handler);

        registry.dispatch("move", &Payload::new());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_off_removes_only_that_registration() {
        let registry = HandlerRegistry::new();
        let first = registry.on("move", |_| Ok(()));
        let second = registry.on("move", |_| Ok(()));

        assert!(registry.off("move", first));
        assert_eq!(registry.handler_count("move"), 1);
        assert!(!registry.off("move", first));
        assert!(!registry.off("other", second));
        assert!(registry.off("move", second));
        assert_eq!(registry.handler_count("move"), 0);
    }

    #[test]
    fn test_failing_handlers_do_not_stop_later_ones() {
        let registry = HandlerRegistry::new();
        let count = Arc::new(AtomicU32::new(0));

        registry.on("state", |_| Err(anyhow::anyhow!("handler failed")));
        registry.on("state", |_| panic!("handler exploded"));
        let count_clone = Arc::clone(&count);
        registry.on("state", move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        registry.dispatch("state", &Payload::new());
        registry.dispatch("state", &Payload::new());

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unregistered_type_is_a_no_op() {
        let registry = HandlerRegistry::new();
        registry.on("state", |_| Ok(()));

        assert_eq!(registry.dispatch("unknown", &Payload::new()), 0);
    }

    #[test]
    fn test_handler_may_register_during_dispatch() {
        let registry = HandlerRegistry::new();
        let count = Arc::new(AtomicU32::new(0));

        let registry_clone = registry.clone();
        let count_clone = Arc::clone(&count);
        registry.on("state", move |_| {
            let count = Arc::clone(&count_clone);
            registry_clone.on("state", move |_| {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
            Ok(())
        });

        assert_eq!(registry.dispatch("state", &Payload::new()), 1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(registry.handler_count("state"), 2);
    }
}
