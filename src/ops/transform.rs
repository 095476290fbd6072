//! Per-value transform operators: each, map, filter

use crate::ops::{StageDone, StageDriver};
use crate::queue::Queue;
use crate::stage::{Completion, UnaryFn};
use crate::value::Value;

/// Side-effect stage: invokes the function and forwards the original
/// value unchanged, whatever the function returns.
struct EachDriver {
    func: UnaryFn,
}

impl StageDriver for EachDriver {
    fn process(&mut self, value: Value, done: StageDone) {
        let original = value.clone();
        self.func.invoke(
            value,
            Completion::new(move |_result| done.emit_one(original)),
        );
    }
}

/// Transform stage: forwards the function's result.
struct MapDriver {
    func: UnaryFn,
}

impl StageDriver for MapDriver {
    fn process(&mut self, value: Value, done: StageDone) {
        self.func
            .invoke(value, Completion::new(move |result| done.emit_one(result)));
    }
}

/// Predicate stage: forwards the original value when the predicate's
/// result is truthy, drops it otherwise.
struct FilterDriver {
    predicate: UnaryFn,
}

impl StageDriver for FilterDriver {
    fn process(&mut self, value: Value, done: StageDone) {
        let original = value.clone();
        self.predicate.invoke(
            value,
            Completion::new(move |verdict| {
                if verdict.is_truthy() {
                    done.emit_one(original);
                } else {
                    done.done();
                }
            }),
        );
    }
}

impl Queue {
    /// Invoke `func` for every value, forwarding the original value
    /// downstream unchanged. Side effects only.
    pub fn each(&self, func: UnaryFn) -> Queue {
        self.attach(Box::new(EachDriver { func }))
    }

    /// Forward `func`'s result for every value.
    pub fn map(&self, func: UnaryFn) -> Queue {
        self.attach(Box::new(MapDriver { func }))
    }

    /// Forward only the values for which `predicate` returns a truthy
    /// result. Dropped values are not errors.
    pub fn filter(&self, predicate: UnaryFn) -> Queue {
        self.attach(Box::new(FilterDriver { predicate }))
    }
}
