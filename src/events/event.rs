//! Event types dispatched by queues

use std::time::SystemTime;

use crate::value::Value;

/// The five observable queue events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum QueueEventKind {
    /// A value is about to be enqueued. Cancelable: a `Cancel` outcome
    /// vetoes the enqueue and the push reports failure to its caller.
    Push,
    /// A value was dequeued for stage processing.
    Pull,
    /// A dequeue left the buffer empty.
    Empty,
    /// The queue is about to transition from `closing` to `closed`.
    /// Cancelable: a `Cancel` outcome leaves the queue in `closing`.
    Close,
    /// The queue was killed.
    Kill,
}

/// Payload handed to event listeners.
#[derive(Debug, Clone)]
pub struct QueueEvent {
    pub kind: QueueEventKind,
    pub timestamp: SystemTime,
    /// Identifier of the dispatching queue (registry name or `anon-N`).
    pub queue_id: String,
    /// The value involved, for `push` and `pull`.
    pub value: Option<Value>,
    /// Buffered values at dispatch time.
    pub size: usize,
}

impl QueueEvent {
    pub fn new(kind: QueueEventKind, queue_id: String, size: usize) -> Self {
        Self {
            kind,
            timestamp: SystemTime::now(),
            queue_id,
            value: None,
            size,
        }
    }

    pub fn with_value(kind: QueueEventKind, queue_id: String, value: Value, size: usize) -> Self {
        Self {
            kind,
            timestamp: SystemTime::now(),
            queue_id,
            value: Some(value),
            size,
        }
    }
}
