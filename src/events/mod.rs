//! Event subsystem for queue lifecycle observation
//!
//! Every queue dispatches `push`, `pull`, `empty`, `close` and `kill`
//! events to its registered listeners in registration order. Dispatch is
//! cancelable: the first handler returning [`EventOutcome::Cancel`] stops
//! the remaining handlers and, for the cancelable transitions (`push`
//! enqueueing and the `closing -> closed` transition), aborts the
//! transition itself. `pull`, `empty` and `kill` are observational; their
//! outcome is not consulted.

mod dispatch;
mod event;

pub use dispatch::{EventHandler, EventOutcome, ListenerSet};
pub use event::{QueueEvent, QueueEventKind};
