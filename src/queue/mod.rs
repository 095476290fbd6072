//! Queue Core Component
//!
//! The central primitive of the pipeline engine: an ordered buffer with
//! an attached processing stage, a closing/killing lifecycle and at most
//! one stage invocation in flight at any time. Operators compose queues
//! into chains and branching graphs; the registry makes queues
//! addressable by name across independently-defined chains.
//!
//! # Overview
//!
//! Key guarantees:
//!
//! - **Per-stage FIFO**: values leave a queue in the order they entered
//!   it, regardless of each invocation's completion latency
//! - **Single in-flight invocation**: a stage never starts item *i+1*
//!   before item *i*'s completion has been delivered downstream
//! - **Pipelined overlap**: stage N may begin its next item the instant
//!   its previous push completes, while stage N+1 is still mid-flight
//! - **Cancelable lifecycle**: `push` and `close` listeners can veto
//!   their transitions; `kill` tears a subgraph down immediately
//! - **Pluggable construction**: delivery semantics are a strategy
//!   chosen per registry or per named queue, invisible at call sites
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐ push  ┌─────────────────┐ push  ┌─────────────────┐
//! │ Producer │──────▶│ Queue (stage A) │──────▶│ Queue (stage B) │──▶ ...
//! └──────────┘       │  ┌───┬───┬───┐  │       │  ┌───┬───┐      │
//!                    │  │ 3 │ 2 │ 1 │  │       │  │ 1'│ 0'│      │
//!                    │  └───┴───┴───┘  │       │  └───┴───┘      │
//!                    │   in-flight ≤ 1 │       │   in-flight ≤ 1 │
//!                    └─────────────────┘       └─────────────────┘
//!                            │ branch/chain by name
//!                            ▼
//!                    ┌─────────────────┐
//!                    │  QueueRegistry  │  name ──▶ Queue
//!                    └─────────────────┘
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use flowline::queue::QueueRegistry;
//! use flowline::stage::UnaryFn;
//! use flowline::ops::Sink;
//! use flowline::value::Value;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = QueueRegistry::new();
//!
//! registry
//!     .queue_from(vec![1i64, 2, 3, 4])
//!     .filter(UnaryFn::sync(|v: Value| v.as_f64().map_or(false, |n| n % 2.0 == 0.0)))
//!     .to_array(Sink::callback(|evens| println!("{evens:?}")));
//! # Ok(())
//! # }
//! ```

mod error;
mod handle;
mod internal;
mod registry;
mod strategy;

pub use error::{QueueError, QueueResult};
pub use handle::Queue;
pub use internal::LifecycleState;
pub use registry::QueueRegistry;
pub use strategy::{FifoStrategy, LifoStrategy, QueueBuffer, QueueStrategy};

pub(crate) use handle::WeakQueue;
pub(crate) use internal::QueueInner;

/// Bookkeeping snapshot for a single queue
#[derive(Debug, Clone, PartialEq)]
pub struct QueueStats {
    /// Buffered values awaiting processing
    pub depth: usize,
    /// Stage invocations completed over the queue's lifetime
    pub processed: u64,
    /// Current lifecycle state
    pub state: LifecycleState,
    /// Whether a stage invocation is currently outstanding
    pub in_flight: bool,
}

/// Bookkeeping snapshot for a registry
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryStats {
    /// Named queues currently registered
    pub named_queues: usize,
    /// Anonymous queues created over the registry's lifetime
    pub anonymous_created: u64,
}

#[cfg(test)]
mod tests;
