//! flowline - an in-process pipeline engine
//!
//! Composes data-processing steps — ordinary unary/binary functions,
//! synchronous or asynchronous — into chains and branching graphs of
//! queues with FIFO semantics per stage and pipelined overlap across
//! stages.
//!
//! Entry points: [`queue::QueueRegistry`] creates queues and resolves
//! named ones; operators on [`queue::Queue`] build the graph; the
//! [`stage`] module's tagged function types state sync-vs-async
//! explicitly at each call site.

pub mod core;
pub mod events;
pub mod ops;
pub mod queue;
pub mod stage;
pub mod value;
