//! Sequence-unpacking operator

use crate::ops::{StageDone, StageDriver};
use crate::queue::Queue;
use crate::value::Value;

/// Unpacks nested sequences element by element, up to `depth` levels.
struct FlattenDriver {
    depth: usize,
}

impl StageDriver for FlattenDriver {
    fn process(&mut self, value: Value, done: StageDone) {
        let mut outputs = Vec::new();
        expand(value, self.depth, &mut outputs);
        done.emit(outputs);
    }
}

fn expand(value: Value, depth: usize, outputs: &mut Vec<Value>) {
    match value {
        Value::Seq(items) if depth > 0 => {
            for item in items {
                expand(item, depth - 1, outputs);
            }
        }
        other => outputs.push(other),
    }
}

impl Queue {
    /// Recursively unpack sequence values into their elements, without a
    /// depth bound. Non-sequence values pass through unchanged.
    pub fn flatten(&self) -> Queue {
        self.flatten_depth(usize::MAX)
    }

    /// Unpack sequence values up to `depth` levels; `0` passes every
    /// value through as-is.
    pub fn flatten_depth(&self, depth: usize) -> Queue {
        self.attach(Box::new(FlattenDriver { depth }))
    }
}
