//! Callback-convention API adapter
//!
//! `exec` bridges a two-role callback convention — an API taking
//! positional arguments plus a completion callback reporting either an
//! error or a result — into a queue stage. Sequence values are spread
//! into the argument list; anything else becomes the sole argument. The
//! error policy is the engine's only structured error-recovery path.

use std::sync::{Arc, Mutex};

use crate::core::error_handling::log_error_with_context;
use crate::ops::{StageBinding, StageDone, StageDriver};
use crate::queue::Queue;
use crate::value::Value;

/// A failed API invocation, as handed to `Report` callbacks or routed
/// to a named queue.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecFailure {
    /// The error the API reported.
    pub error: Value,
    /// Partial result reported alongside the error, if any.
    pub partial: Option<Value>,
    /// The arguments the API was invoked with.
    pub args: Vec<Value>,
}

impl ExecFailure {
    /// `[error, partial-or-null, args]` representation pushed into a
    /// `RouteTo` queue.
    fn into_value(self) -> Value {
        Value::Seq(vec![
            self.error,
            self.partial.unwrap_or(Value::Null),
            Value::Seq(self.args),
        ])
    }
}

enum ExecOutcome {
    Ok(Value),
    Err { error: Value, partial: Option<Value> },
}

/// One-shot reply handle passed to the adapted API.
pub struct ExecReply {
    notify: Option<Box<dyn FnOnce(ExecOutcome) + Send>>,
}

impl ExecReply {
    fn new(notify: impl FnOnce(ExecOutcome) + Send + 'static) -> Self {
        Self {
            notify: Some(Box::new(notify)),
        }
    }

    fn settle(mut self, outcome: ExecOutcome) {
        if let Some(notify) = self.notify.take() {
            notify(outcome);
        }
    }

    /// Report success; `result` is pushed to the stage's downstream.
    pub fn ok(self, result: impl Into<Value>) {
        self.settle(ExecOutcome::Ok(result.into()));
    }

    /// Report failure.
    pub fn err(self, error: impl Into<Value>) {
        self.settle(ExecOutcome::Err {
            error: error.into(),
            partial: None,
        });
    }

    /// Report failure alongside a partial result.
    pub fn err_with_partial(self, error: impl Into<Value>, partial: impl Into<Value>) {
        self.settle(ExecOutcome::Err {
            error: error.into(),
            partial: Some(partial.into()),
        });
    }
}

impl Drop for ExecReply {
    fn drop(&mut self) {
        if self.notify.is_some() {
            log::warn!("exec reply dropped without resolving; the issuing queue is stalled");
        }
    }
}

impl std::fmt::Debug for ExecReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecReply")
            .field("resolved", &self.notify.is_none())
            .finish()
    }
}

/// What an `exec` stage does when the API reports an error.
pub enum ExecErrorPolicy {
    /// Drop the failure and keep processing.
    Ignore,
    /// Close this queue and its downstream immediately.
    CloseOnError,
    /// Close as with `CloseOnError`, handing the failure to a callback
    /// first.
    Report(Box<dyn FnMut(ExecFailure) + Send>),
    /// Push `[error, partial-or-null, args]` into the named queue and
    /// keep processing.
    RouteTo(String),
}

impl ExecErrorPolicy {
    pub fn report<F>(f: F) -> Self
    where
        F: FnMut(ExecFailure) + Send + 'static,
    {
        ExecErrorPolicy::Report(Box::new(f))
    }

    pub fn route_to(name: impl Into<String>) -> Self {
        ExecErrorPolicy::RouteTo(name.into())
    }
}

impl std::fmt::Debug for ExecErrorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecErrorPolicy::Ignore => write!(f, "Ignore"),
            ExecErrorPolicy::CloseOnError => write!(f, "CloseOnError"),
            ExecErrorPolicy::Report(_) => write!(f, "Report"),
            ExecErrorPolicy::RouteTo(name) => write!(f, "RouteTo({name:?})"),
        }
    }
}

struct ExecDriver {
    api: Box<dyn FnMut(Vec<Value>, ExecReply) + Send>,
    /// Shared with deferred replies so the policy callback state
    /// survives across invocations.
    policy: Arc<Mutex<ExecErrorPolicy>>,
    binding: Option<StageBinding>,
}

impl StageDriver for ExecDriver {
    fn bind(&mut self, binding: StageBinding) {
        self.binding = Some(binding);
    }

    fn process(&mut self, value: Value, done: StageDone) {
        let args = match value {
            Value::Seq(items) => items,
            other => vec![other],
        };
        let Some(binding) = self.binding.as_ref() else {
            done.done();
            return;
        };

        let this = binding.this.clone();
        let downstream = binding.downstream.clone();
        let registry = binding.registry.clone();
        let policy = Arc::clone(&self.policy);
        let invoked_args = args.clone();

        let reply = ExecReply::new(move |outcome| match outcome {
            ExecOutcome::Ok(result) => done.emit_one(result),
            ExecOutcome::Err { error, partial } => {
                let failure = ExecFailure {
                    error,
                    partial,
                    args: invoked_args,
                };
                let mut guard = policy.lock().unwrap();
                match &mut *guard {
                    ExecErrorPolicy::Ignore => {
                        drop(guard);
                        done.done();
                    }
                    ExecErrorPolicy::CloseOnError => {
                        drop(guard);
                        if let Some(queue) = this.upgrade() {
                            queue.close();
                        }
                        downstream.close();
                        done.done();
                    }
                    ExecErrorPolicy::Report(callback) => {
                        callback(failure);
                        drop(guard);
                        if let Some(queue) = this.upgrade() {
                            queue.close();
                        }
                        downstream.close();
                        done.done();
                    }
                    ExecErrorPolicy::RouteTo(name) => {
                        let target = name.clone();
                        drop(guard);
                        match registry.lookup(&target) {
                            Ok(queue) => {
                                queue.push(failure.into_value());
                            }
                            Err(err) => log_error_with_context(&err, "exec failure routing"),
                        }
                        done.done();
                    }
                }
            }
        });

        (self.api)(args, reply);
    }
}

impl Queue {
    /// Adapt a callback-convention API into a stage. Sequence values are
    /// spread into the API's argument list; other values are passed as
    /// the sole argument. Successful results go downstream as with
    /// `map`; failures follow `policy`.
    pub fn exec<F>(&self, api: F, policy: ExecErrorPolicy) -> Queue
    where
        F: FnMut(Vec<Value>, ExecReply) + Send + 'static,
    {
        self.attach(Box::new(ExecDriver {
            api: Box::new(api),
            policy: Arc::new(Mutex::new(policy)),
            binding: None,
        }))
    }
}
