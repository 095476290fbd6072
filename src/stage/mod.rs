//! Stage function types and the uniform completion contract
//!
//! Operators accept user functions through the tagged types in this
//! module: the caller states synchronous-vs-asynchronous explicitly at
//! construction instead of the engine guessing. Every variant is invoked
//! through the same internal contract — the function receives its
//! arguments plus a one-shot [`Completion`] and the stage finishes when
//! the completion resolves — so the queue core never needs to know which
//! kind it is driving.
//!
//! - [`UnaryFn::sync`] / [`BinaryFn::sync`]: plain functions, resolved
//!   before `invoke` returns.
//! - [`UnaryFn::deferred`] / [`BinaryFn::deferred`]: the function keeps
//!   the [`Completion`] and resolves it later, from any thread. This is
//!   the explicit "force async" escape hatch.
//! - [`UnaryFn::future`] / [`BinaryFn::future`]: the function returns a
//!   future which is spawned on the ambient tokio runtime; the completion
//!   resolves with the future's output. Requires a running runtime.
//!
//! A completion that is dropped unresolved stalls its queue permanently;
//! there is no timeout mechanism. The drop is logged as a warning.

use std::fmt;

use futures::future::{BoxFuture, FutureExt};
use std::future::Future;

use crate::value::Value;

/// One-shot completion signal for a stage invocation.
///
/// Resolving delivers the stage function's result to the queue that
/// issued the invocation. Each completion can be resolved exactly once;
/// dropping it without resolving leaves the issuing queue with its single
/// in-flight slot occupied forever.
pub struct Completion {
    notify: Option<Box<dyn FnOnce(Value) + Send>>,
}

impl Completion {
    pub(crate) fn new(notify: impl FnOnce(Value) + Send + 'static) -> Self {
        Self {
            notify: Some(Box::new(notify)),
        }
    }

    /// Deliver the stage result and consume the completion.
    pub fn resolve(mut self, value: impl Into<Value>) {
        if let Some(notify) = self.notify.take() {
            notify(value.into());
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if self.notify.is_some() {
            log::warn!("stage completion dropped without resolving; the issuing queue is stalled");
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("resolved", &self.notify.is_none())
            .finish()
    }
}

/// A user function of one value, tagged sync or async at construction.
pub enum UnaryFn {
    Sync(Box<dyn FnMut(Value) -> Value + Send>),
    Deferred(Box<dyn FnMut(Value, Completion) + Send>),
    Future(Box<dyn FnMut(Value) -> BoxFuture<'static, Value> + Send>),
}

impl UnaryFn {
    /// A synchronous function; its return value is the stage result.
    pub fn sync<F, R>(mut f: F) -> Self
    where
        F: FnMut(Value) -> R + Send + 'static,
        R: Into<Value>,
    {
        UnaryFn::Sync(Box::new(move |value| f(value).into()))
    }

    /// An asynchronous function that resolves the completion itself.
    pub fn deferred<F>(f: F) -> Self
    where
        F: FnMut(Value, Completion) + Send + 'static,
    {
        UnaryFn::Deferred(Box::new(f))
    }

    /// A future-returning function, run on the ambient tokio runtime.
    pub fn future<F, Fut>(mut f: F) -> Self
    where
        F: FnMut(Value) -> Fut + Send + 'static,
        Fut: Future<Output = Value> + Send + 'static,
    {
        UnaryFn::Future(Box::new(move |value| f(value).boxed()))
    }

    /// Invoke the function under the uniform completion contract.
    pub(crate) fn invoke(&mut self, value: Value, done: Completion) {
        match self {
            UnaryFn::Sync(f) => done.resolve(f(value)),
            UnaryFn::Deferred(f) => f(value, done),
            UnaryFn::Future(f) => {
                let fut = f(value);
                tokio::spawn(async move {
                    done.resolve(fut.await);
                });
            }
        }
    }
}

impl fmt::Debug for UnaryFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            UnaryFn::Sync(_) => "sync",
            UnaryFn::Deferred(_) => "deferred",
            UnaryFn::Future(_) => "future",
        };
        write!(f, "UnaryFn::{tag}")
    }
}

/// A user function of two values (accumulator and item), tagged sync or
/// async at construction. Used by `reduce`.
pub enum BinaryFn {
    Sync(Box<dyn FnMut(Value, Value) -> Value + Send>),
    Deferred(Box<dyn FnMut(Value, Value, Completion) + Send>),
    Future(Box<dyn FnMut(Value, Value) -> BoxFuture<'static, Value> + Send>),
}

impl BinaryFn {
    pub fn sync<F, R>(mut f: F) -> Self
    where
        F: FnMut(Value, Value) -> R + Send + 'static,
        R: Into<Value>,
    {
        BinaryFn::Sync(Box::new(move |acc, value| f(acc, value).into()))
    }

    pub fn deferred<F>(f: F) -> Self
    where
        F: FnMut(Value, Value, Completion) + Send + 'static,
    {
        BinaryFn::Deferred(Box::new(f))
    }

    pub fn future<F, Fut>(mut f: F) -> Self
    where
        F: FnMut(Value, Value) -> Fut + Send + 'static,
        Fut: Future<Output = Value> + Send + 'static,
    {
        BinaryFn::Future(Box::new(move |acc, value| f(acc, value).boxed()))
    }

    pub(crate) fn invoke(&mut self, acc: Value, value: Value, done: Completion) {
        match self {
            BinaryFn::Sync(f) => done.resolve(f(acc, value)),
            BinaryFn::Deferred(f) => f(acc, value, done),
            BinaryFn::Future(f) => {
                let fut = f(acc, value);
                tokio::spawn(async move {
                    done.resolve(fut.await);
                });
            }
        }
    }
}

impl fmt::Debug for BinaryFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            BinaryFn::Sync(_) => "sync",
            BinaryFn::Deferred(_) => "deferred",
            BinaryFn::Future(_) => "future",
        };
        write!(f, "BinaryFn::{tag}")
    }
}
