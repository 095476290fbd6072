//! Public queue handle
//!
//! [`Queue`] is a lightweight clonable handle over the shared queue
//! internals. Handles are how everything refers to a queue: operators
//! return the handle of the stage's output queue, the registry hands out
//! handles for named queues, and stage drivers hold weak handles back to
//! the queue they serve.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::core::sync::handle_mutex_poison;
use crate::events::{EventOutcome, QueueEvent, QueueEventKind};
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::internal::{LifecycleState, QueueInner};
use crate::queue::registry::QueueRegistry;
use crate::queue::QueueStats;
use crate::value::Value;

/// Handle to a queue.
///
/// Cloning is cheap and every clone refers to the same queue. A queue
/// stays alive while any handle, registry entry or in-flight stage
/// completion references it.
///
/// # Example
///
/// ```rust,no_run
/// use flowline::queue::QueueRegistry;
/// use flowline::stage::UnaryFn;
/// use flowline::ops::Sink;
///
/// let registry = QueueRegistry::new();
/// let doubled = registry
///     .queue_from(vec![1i64, 2, 3])
///     .map(UnaryFn::sync(|v| match v {
///         flowline::value::Value::Int(n) => flowline::value::Value::Int(n * 2),
///         other => other,
///     }))
///     .to_array(Sink::callback(|result| println!("{result:?}")));
/// # let _ = doubled;
/// ```
#[derive(Clone)]
pub struct Queue {
    inner: Arc<QueueInner>,
}

impl Queue {
    pub(crate) fn from_inner(inner: Arc<QueueInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> WeakQueue {
        WeakQueue {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub(crate) fn attach(&self, driver: Box<dyn crate::ops::StageDriver>) -> Queue {
        QueueInner::attach(&self.inner, driver)
    }

    /// Identifier of this queue: the registry name for named queues, a
    /// generated `anon-N` otherwise.
    pub fn id(&self) -> &str {
        self.inner.id()
    }

    /// The registry this queue was created from.
    pub fn registry(&self) -> QueueRegistry {
        self.inner.registry().clone()
    }

    /// Whether two handles refer to the same queue.
    pub fn same_queue(&self, other: &Queue) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Push a value, reporting whether it was accepted.
    ///
    /// Pushing into a `closing`, `closed` or `killed` queue is a no-op
    /// that returns `false`; so does a push vetoed by a `push` listener.
    pub fn push(&self, value: impl Into<Value>) -> bool {
        match QueueInner::push_value(&self.inner, value.into()) {
            Ok(()) => true,
            Err(err) => {
                log::trace!("push dropped: {err}");
                false
            }
        }
    }

    /// Push a value, surfacing the rejection reason instead of dropping
    /// it silently.
    pub fn try_push(&self, value: impl Into<Value>) -> QueueResult<()> {
        QueueInner::push_value(&self.inner, value.into())
    }

    /// Push every value in order; returns how many were accepted.
    pub fn push_all<I, V>(&self, values: I) -> usize
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut accepted = 0;
        for value in values {
            if self.push(value) {
                accepted += 1;
            }
        }
        accepted
    }

    /// Begin the closing transition: no new values are accepted and the
    /// queue settles to `closed` once its buffer drains.
    pub fn close(&self) {
        QueueInner::close(&self.inner);
    }

    /// Arm auto-closing: the queue transitions to `closing` the moment
    /// its buffer is (or becomes) empty.
    pub fn close_on_empty(&self) {
        QueueInner::close_on_empty(&self.inner);
    }

    /// Immediately discard the buffer and tear the queue down,
    /// propagating to owned downstream queues. A stage invocation
    /// already running is not interrupted; its completion is discarded.
    pub fn kill(&self) {
        QueueInner::kill(&self.inner);
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.state()
    }

    /// Number of buffered values awaiting processing.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of queue bookkeeping.
    pub fn stats(&self) -> QueueResult<QueueStats> {
        let core = handle_mutex_poison(self.inner.lock_core(), |message| {
            QueueError::OperationFailed { message }
        })?;
        Ok(QueueInner::stats_of(&core))
    }

    /// Register a cancelable event handler; handlers run in registration
    /// order and the first `Cancel` outcome stops dispatch.
    pub fn on<F>(&self, kind: QueueEventKind, handler: F)
    where
        F: FnMut(&QueueEvent) -> EventOutcome + Send + 'static,
    {
        self.inner.listeners().subscribe(kind, Box::new(handler));
    }

    /// Register an observation-only handler that never cancels.
    pub fn observe<F>(&self, kind: QueueEventKind, mut handler: F)
    where
        F: FnMut(&QueueEvent) + Send + 'static,
    {
        self.on(kind, move |event| {
            handler(event);
            EventOutcome::Continue
        });
    }
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}

/// Weak handle used by stage drivers to refer back to the queue they are
/// attached to without keeping it alive.
pub(crate) struct WeakQueue {
    inner: Weak<QueueInner>,
}

impl WeakQueue {
    pub(crate) fn upgrade(&self) -> Option<Queue> {
        self.inner.upgrade().map(Queue::from_inner)
    }
}

impl Clone for WeakQueue {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}
