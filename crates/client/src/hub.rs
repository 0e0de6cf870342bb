// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Typed publish/subscribe surface between the connection and its consumers.
//!
//! Handlers for one event name run in subscription order, synchronously with
//! the emitter. Each handler runs in isolation: a panicking handler is logged
//! and the remaining handlers still run.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{error, trace};

use crate::event::Event;

/// A registered event handler.
pub type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Identity of a registration, returned by [`EventHub::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: HashMap<String, Vec<(SubscriptionId, Handler)>>,
}

/// Event hub keyed by event name.
#[derive(Default)]
pub struct EventHub {
    registry: Mutex<Registry>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    // Handlers never run while the registry is locked, so a poisoned lock
    // still holds a consistent table.
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a handler for `event`. Handlers are invoked in the order
    /// they were registered.
    pub fn on<F>(&self, event: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let mut registry = self.registry();
        registry.next_id += 1;
        let id = SubscriptionId(registry.next_id);
        registry
            .handlers
            .entry(event.to_string())
            .or_default()
            .push((id, Arc::new(handler)));
        trace!(event, ?id, "handler registered");
        id
    }

    /// Remove a specific registration. Returns false if it was not present.
    pub fn off(&self, event: &str, id: SubscriptionId) -> bool {
        let mut registry = self.registry();
        let Some(handlers) = registry.handlers.get_mut(event) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(registered, _)| *registered != id);
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            registry.handlers.remove(event);
        }
        removed
    }

    /// Number of handlers currently registered for `event`.
    #[cfg(test)]
    pub(crate) fn handler_count(&self, event: &str) -> usize {
        self.registry().handlers.get(event).map_or(0, Vec::len)
    }

    /// Invoke every handler currently registered for `event`.
    ///
    /// The handler list is snapshotted first, so handlers may subscribe or
    /// unsubscribe from inside a callback; such changes apply to the next
    /// emit. Returns the number of handlers that completed without panicking.
    pub fn emit(&self, event: &str, data: &Event) -> usize {
        let handlers: Vec<Handler> = match self.registry().handlers.get(event) {
            Some(handlers) => handlers.iter().map(|(_, h)| Arc::clone(h)).collect(),
            None => return 0,
        };

        let mut delivered = 0;
        for handler in handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(data))) {
                Ok(()) => delivered += 1,
                Err(cause) => {
                    error!(event, cause = panic_message(&*cause), "event handler panicked");
                }
            }
        }
        delivered
    }
}

fn panic_message(cause: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = cause.downcast_ref::<&str>() {
        message
    } else if let Some(message) = cause.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
