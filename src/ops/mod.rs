//! Operator layer
//!
//! Operators turn user functions into queue stages. Each operator call
//! attaches a [`StageDriver`] to the receiving queue and returns the new
//! anonymous queue carrying the stage's output, so chains compose by
//! reference:
//!
//! ```rust,no_run
//! use flowline::queue::QueueRegistry;
//! use flowline::stage::UnaryFn;
//! use flowline::ops::Sink;
//! use flowline::value::Value;
//!
//! let registry = QueueRegistry::new();
//! registry
//!     .queue_from(vec![1i64, 2, 3])
//!     .map(UnaryFn::sync(|v: Value| Value::Int(v.as_f64().unwrap_or(0.0) as i64 + 1)))
//!     .to_array(Sink::callback(|all| println!("{all:?}")));
//! ```
//!
//! The reduce family (`reduce`, `every`, `some`, `to_array`) propagates
//! nothing per item; its single final result goes to a [`Sink`] once the
//! queue it is attached to closes. `branch` and `chain` route values to
//! named queues through the registry, and `exec` adapts callback-style
//! APIs with a four-way error policy.

mod exec;
mod flatten;
mod reduce;
mod route;
mod transform;

pub use exec::{ExecErrorPolicy, ExecFailure, ExecReply};
pub use reduce::Sink;

use std::sync::Arc;

use crate::queue::{Queue, QueueInner, QueueRegistry, WeakQueue};
use crate::value::Value;

/// Handles a stage driver needs to do its work: the queue it serves
/// (weak, to avoid a reference cycle), the anonymous downstream created
/// for it, and the registry for named-queue routing.
pub(crate) struct StageBinding {
    pub this: WeakQueue,
    pub downstream: Queue,
    pub registry: QueueRegistry,
}

impl StageBinding {
    /// Identifier of the queue this stage serves, for log context.
    fn this_id(&self) -> String {
        self.this
            .upgrade()
            .map(|queue| queue.id().to_string())
            .unwrap_or_else(|| "<dropped>".to_string())
    }
}

/// One queue stage: receives each buffered value in order and reports
/// its outputs through [`StageDone`]. `finish` runs once, after the
/// queue the stage is attached to reaches `closed`.
pub(crate) trait StageDriver: Send {
    /// Called once at attach time, before any value is processed.
    fn bind(&mut self, binding: StageBinding) {
        let _ = binding;
    }

    /// Process one value. Must eventually consume `done`, either before
    /// returning (synchronous stages) or from a deferred completion.
    fn process(&mut self, value: Value, done: StageDone);

    /// Deliver any pending finalizer (reduce-family sinks).
    fn finish(&mut self) {}
}

/// One-shot token completing a single stage invocation: the listed
/// outputs are pushed to the stage's downstream queue, the in-flight
/// slot is released and the queue pump re-enters.
pub(crate) struct StageDone {
    queue: Arc<QueueInner>,
    epoch: u64,
}

impl StageDone {
    pub(crate) fn new(queue: Arc<QueueInner>, epoch: u64) -> Self {
        Self { queue, epoch }
    }

    /// Complete with any number of downstream outputs.
    pub(crate) fn emit(self, outputs: Vec<Value>) {
        QueueInner::complete_stage(&self.queue, self.epoch, outputs);
    }

    /// Complete with exactly one downstream output.
    pub(crate) fn emit_one(self, value: Value) {
        self.emit(vec![value]);
    }

    /// Complete with no downstream output.
    pub(crate) fn done(self) {
        self.emit(Vec::new());
    }
}
