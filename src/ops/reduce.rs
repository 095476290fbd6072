//! Reduce-family operators: reduce, every, some, to_array
//!
//! These stages accumulate in the driver's own state rather than the
//! queue buffer and propagate nothing downstream per item. The single
//! final result is delivered to a [`Sink`] when the queue the stage is
//! attached to reaches `closed` — never before, and never at all if the
//! close transition is canceled by a listener.

use std::sync::{Arc, Mutex};

use crate::core::error_handling::log_error_with_context;
use crate::ops::{StageBinding, StageDone, StageDriver};
use crate::queue::{Queue, QueueRegistry};
use crate::stage::{BinaryFn, Completion, UnaryFn};
use crate::value::Value;

/// Destination for a reduce-family stage's final result: either a
/// one-shot callback or the name of a registry queue the result is
/// pushed into.
pub enum Sink {
    Callback(Box<dyn FnOnce(Value) + Send>),
    Named(String),
}

impl Sink {
    pub fn callback<F>(f: F) -> Self
    where
        F: FnOnce(Value) + Send + 'static,
    {
        Sink::Callback(Box::new(f))
    }

    pub fn named(name: impl Into<String>) -> Self {
        Sink::Named(name.into())
    }

    /// Deliver the final value.
    fn deliver(self, value: Value, registry: &QueueRegistry, queue_id: &str) {
        match self {
            Sink::Callback(f) => f(value),
            Sink::Named(name) => match registry.lookup(&name) {
                Ok(target) => {
                    if !target.push(value) {
                        log::warn!(
                            "queue '{}': sink target '{}' rejected the final value",
                            queue_id,
                            name
                        );
                    }
                }
                Err(err) => log_error_with_context(&err, "final value delivery"),
            },
        }
    }
}

impl From<&str> for Sink {
    fn from(name: &str) -> Self {
        Sink::named(name)
    }
}

impl From<String> for Sink {
    fn from(name: String) -> Self {
        Sink::named(name)
    }
}

impl std::fmt::Debug for Sink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sink::Callback(_) => write!(f, "Sink::Callback"),
            Sink::Named(name) => write!(f, "Sink::Named({name:?})"),
        }
    }
}

/// General reduction: folds every value into an accumulator held in the
/// driver, delivering the final accumulator on close.
struct ReduceDriver {
    func: BinaryFn,
    /// Shared with deferred completions; `None` only mid-invocation.
    acc: Arc<Mutex<Option<Value>>>,
    sink: Option<Sink>,
    binding: Option<StageBinding>,
}

impl StageDriver for ReduceDriver {
    fn bind(&mut self, binding: StageBinding) {
        self.binding = Some(binding);
    }

    fn process(&mut self, value: Value, done: StageDone) {
        let slot = Arc::clone(&self.acc);
        let current = slot.lock().unwrap().take().unwrap_or(Value::Null);
        self.func.invoke(
            current,
            value,
            Completion::new(move |next| {
                *slot.lock().unwrap() = Some(next);
                done.done();
            }),
        );
    }

    fn finish(&mut self) {
        let Some(sink) = self.sink.take() else {
            return;
        };
        let Some(binding) = self.binding.as_ref() else {
            return;
        };
        let value = self.acc.lock().unwrap().take().unwrap_or(Value::Null);
        sink.deliver(value, &binding.registry, &binding.this_id());
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Quantifier {
    All,
    Any,
}

/// Boolean reduction with short-circuiting. Once the verdict settles,
/// remaining buffered values drain and are discarded without invoking
/// the predicate; in-flight bookkeeping still advances so closing
/// semantics are unaffected.
struct QuantifierDriver {
    predicate: UnaryFn,
    mode: Quantifier,
    verdict: Arc<Mutex<Option<bool>>>,
    sink: Option<Sink>,
    binding: Option<StageBinding>,
}

impl StageDriver for QuantifierDriver {
    fn bind(&mut self, binding: StageBinding) {
        self.binding = Some(binding);
    }

    fn process(&mut self, value: Value, done: StageDone) {
        if self.verdict.lock().unwrap().is_some() {
            done.done();
            return;
        }
        let verdict = Arc::clone(&self.verdict);
        let mode = self.mode;
        self.predicate.invoke(
            value,
            Completion::new(move |result| {
                let truthy = result.is_truthy();
                {
                    let mut settled = verdict.lock().unwrap();
                    match mode {
                        Quantifier::All if !truthy => *settled = Some(false),
                        Quantifier::Any if truthy => *settled = Some(true),
                        _ => {}
                    }
                }
                done.done();
            }),
        );
    }

    fn finish(&mut self) {
        let Some(sink) = self.sink.take() else {
            return;
        };
        let Some(binding) = self.binding.as_ref() else {
            return;
        };
        let verdict = self.verdict.lock().unwrap().unwrap_or(match self.mode {
            Quantifier::All => true,
            Quantifier::Any => false,
        });
        sink.deliver(Value::Bool(verdict), &binding.registry, &binding.this_id());
    }
}

/// Collects every value in arrival order, delivering the full sequence
/// on close.
struct ToArrayDriver {
    items: Vec<Value>,
    sink: Option<Sink>,
    binding: Option<StageBinding>,
}

impl StageDriver for ToArrayDriver {
    fn bind(&mut self, binding: StageBinding) {
        self.binding = Some(binding);
    }

    fn process(&mut self, value: Value, done: StageDone) {
        self.items.push(value);
        done.done();
    }

    fn finish(&mut self) {
        let Some(sink) = self.sink.take() else {
            return;
        };
        let Some(binding) = self.binding.as_ref() else {
            return;
        };
        let items = std::mem::take(&mut self.items);
        sink.deliver(Value::Seq(items), &binding.registry, &binding.this_id());
    }
}

impl Queue {
    /// Fold every value into an accumulator starting at `initial`
    /// (`Value::Null` when there is no natural seed). The final
    /// accumulator reaches `sink` only after this queue closes.
    pub fn reduce(
        &self,
        func: BinaryFn,
        sink: impl Into<Sink>,
        initial: impl Into<Value>,
    ) -> Queue {
        self.attach(Box::new(ReduceDriver {
            func,
            acc: Arc::new(Mutex::new(Some(initial.into()))),
            sink: Some(sink.into()),
            binding: None,
        }))
    }

    /// Deliver `true` to `sink` when every value satisfies `predicate`,
    /// short-circuiting to `false` on the first falsy result. The
    /// predicate is not guaranteed to run on every value; do not rely on
    /// it for side effects.
    pub fn every(&self, predicate: UnaryFn, sink: impl Into<Sink>) -> Queue {
        self.attach(Box::new(QuantifierDriver {
            predicate,
            mode: Quantifier::All,
            verdict: Arc::new(Mutex::new(None)),
            sink: Some(sink.into()),
            binding: None,
        }))
    }

    /// Deliver `true` to `sink` when any value satisfies `predicate`,
    /// short-circuiting on the first truthy result.
    pub fn some(&self, predicate: UnaryFn, sink: impl Into<Sink>) -> Queue {
        self.attach(Box::new(QuantifierDriver {
            predicate,
            mode: Quantifier::Any,
            verdict: Arc::new(Mutex::new(None)),
            sink: Some(sink.into()),
            binding: None,
        }))
    }

    /// Collect every value in arrival order, delivering the sequence to
    /// `sink` after this queue closes.
    pub fn to_array(&self, sink: impl Into<Sink>) -> Queue {
        self.attach(Box::new(ToArrayDriver {
            items: Vec::new(),
            sink: Some(sink.into()),
            binding: None,
        }))
    }
}
