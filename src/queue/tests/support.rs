//! Shared test utilities for the queue suites

use std::sync::{Arc, Mutex};

use crate::ops::Sink;
use crate::value::Value;

pub type Captured = Arc<Mutex<Option<Value>>>;

/// A sink that stores its final value for later assertions.
pub fn capture_sink() -> (Sink, Captured) {
    let slot: Captured = Arc::new(Mutex::new(None));
    let out = Arc::clone(&slot);
    let sink = Sink::callback(move |value| {
        *out.lock().unwrap() = Some(value);
    });
    (sink, slot)
}

pub fn captured(slot: &Captured) -> Option<Value> {
    slot.lock().unwrap().clone()
}

pub fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().map(|n| Value::Int(*n)).collect()
}

pub fn seq(values: &[i64]) -> Value {
    Value::Seq(ints(values))
}
