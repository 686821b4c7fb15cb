//! Named-topic pub/sub with isolated handler failures.
//!
//! Handlers run synchronously on the emitting task, in registration order.
//! A panicking handler is logged and skipped; it stays registered and the
//! remaining handlers still run.

use std::collections::{BTreeMap, HashMap};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, error};

use super::EngineEvent;

type Handler = Arc<dyn Fn(&EngineEvent) + Send + Sync>;

/// Returned by [`EventBus::subscribe`]; pass to [`EventBus::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<String, Vec<(SubscriptionId, Handler)>>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `topic`.
    pub fn subscribe<F>(&self, topic: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        handlers
            .entry(topic.to_string())
            .or_default()
            .push((id, Arc::new(handler)));
        debug!(topic, subscription = id.0, "Handler subscribed");
        id
    }

    /// Remove a handler. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let mut removed = false;
        for topic_handlers in handlers.values_mut() {
            let before = topic_handlers.len();
            topic_handlers.retain(|(sub, _)| *sub != id);
            removed |= topic_handlers.len() != before;
        }
        handlers.retain(|_, v| !v.is_empty());
        removed
    }

    /// Deliver `event` to every handler of its topic.
    ///
    /// Returns the number of handlers that panicked.
    pub fn emit(&self, event: &EngineEvent) -> usize {
        let topic = event.topic();
        // Snapshot the list so handlers may (un)subscribe while running.
        let targets: Vec<(SubscriptionId, Handler)> = {
            let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
            handlers.get(topic).cloned().unwrap_or_default()
        };

        let mut failures = 0;
        for (id, handler) in targets {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(event))) {
                failures += 1;
                error!(
                    topic,
                    subscription = id.0,
                    panic = panic_message(panic.as_ref()),
                    "Event handler panicked"
                );
            }
        }
        failures
    }

    pub fn listener_count(&self, topic: &str) -> usize {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        handlers.get(topic).map_or(0, Vec::len)
    }

    /// Handler counts per topic, for diagnostics.
    pub fn listener_counts(&self) -> BTreeMap<String, usize> {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        handlers.iter().map(|(t, v)| (t.clone(), v.len())).collect()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
