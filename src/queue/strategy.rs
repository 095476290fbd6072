//! Pluggable queue construction strategies
//!
//! A [`QueueStrategy`] decides how a queue buffers and releases values.
//! All operators interact with a queue solely through the buffer
//! capability set below, so an alternative strategy (newest-first
//! delivery, for example) can be substituted at registry construction or
//! per named queue without changing any call-site syntax.

use std::collections::VecDeque;

use crate::value::Value;

/// The buffering capability set every queue strategy must provide.
pub trait QueueBuffer: Send {
    fn enqueue(&mut self, value: Value);
    fn dequeue(&mut self) -> Option<Value>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn clear(&mut self);
}

/// Factory for queue buffers, fixed per queue at construction time.
pub trait QueueStrategy: Send + Sync {
    /// Short strategy label used in logs.
    fn name(&self) -> &'static str;
    fn make_buffer(&self) -> Box<dyn QueueBuffer>;
}

/// Strict first-in-first-out delivery; the default strategy.
pub struct FifoStrategy;

impl QueueStrategy for FifoStrategy {
    fn name(&self) -> &'static str {
        "fifo"
    }

    fn make_buffer(&self) -> Box<dyn QueueBuffer> {
        Box::new(FifoBuffer {
            items: VecDeque::new(),
        })
    }
}

struct FifoBuffer {
    items: VecDeque<Value>,
}

impl QueueBuffer for FifoBuffer {
    fn enqueue(&mut self, value: Value) {
        self.items.push_back(value);
    }

    fn dequeue(&mut self) -> Option<Value> {
        self.items.pop_front()
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn clear(&mut self) {
        self.items.clear();
    }
}

/// Newest-first delivery; the in-crate alternative demonstrating that
/// delivery order is a strategy concern, not an operator concern.
pub struct LifoStrategy;

impl QueueStrategy for LifoStrategy {
    fn name(&self) -> &'static str {
        "lifo"
    }

    fn make_buffer(&self) -> Box<dyn QueueBuffer> {
        Box::new(LifoBuffer { items: Vec::new() })
    }
}

struct LifoBuffer {
    items: Vec<Value>,
}

impl QueueBuffer for LifoBuffer {
    fn enqueue(&mut self, value: Value) {
        self.items.push(value);
    }

    fn dequeue(&mut self) -> Option<Value> {
        self.items.pop()
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn clear(&mut self) {
        self.items.clear();
    }
}
