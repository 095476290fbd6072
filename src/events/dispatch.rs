//! Ordered, cancelable listener dispatch
//!
//! Listeners are kept per event kind in registration order. Dispatch runs
//! outside the listener lock so handlers are free to push into queues,
//! close them or register further listeners; handlers added while their
//! own kind is being dispatched take effect from the next dispatch.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::events::event::{QueueEvent, QueueEventKind};

/// Explicit continue/cancel result returned by every event handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Continue,
    Cancel,
}

pub type EventHandler = Box<dyn FnMut(&QueueEvent) -> EventOutcome + Send>;

/// Per-queue listener lists for the five event kinds.
pub struct ListenerSet {
    handlers: Mutex<HashMap<QueueEventKind, Vec<EventHandler>>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
        }
    }

    /// Append a handler to the listener list for `kind`.
    pub fn subscribe(&self, kind: QueueEventKind, handler: EventHandler) {
        self.handlers
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push(handler);
    }

    pub fn handler_count(&self, kind: QueueEventKind) -> usize {
        self.handlers
            .lock()
            .unwrap()
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Dispatch `event` to its kind's handlers in registration order.
    ///
    /// Stops at the first handler returning [`EventOutcome::Cancel`] and
    /// returns `false`; returns `true` when every handler continued (or
    /// none were registered). The caller decides whether `false` aborts
    /// the triggering transition.
    pub fn dispatch(&self, event: &QueueEvent) -> bool {
        let mut active = match self.handlers.lock().unwrap().remove(&event.kind) {
            Some(handlers) => handlers,
            None => return true,
        };

        let mut proceed = true;
        for handler in active.iter_mut() {
            if handler(event) == EventOutcome::Cancel {
                proceed = false;
                break;
            }
        }

        // Merge back, keeping handlers registered during dispatch after
        // the pre-existing ones.
        let mut map = self.handlers.lock().unwrap();
        if let Some(added) = map.remove(&event.kind) {
            active.extend(added);
        }
        map.insert(event.kind, active);

        proceed
    }
}

impl Default for ListenerSet {
    fn default() -> Self {
        Self::new()
    }
}
