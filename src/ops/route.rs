//! Name-based routing operators: branch and chain
//!
//! Both route values into named queues through the registry. Neither
//! owns its targets: close/kill never propagate to a named destination,
//! since other chains may feed the same queue. Callers wanting teardown
//! propagation wire it explicitly through close/kill listeners.

use crate::core::error_handling::log_error_with_context;
use crate::ops::{StageBinding, StageDone, StageDriver};
use crate::queue::{Queue, QueueRegistry};
use crate::stage::{Completion, UnaryFn};
use crate::value::Value;

fn route_to(registry: &QueueRegistry, name: &str, value: Value, source_id: &str) {
    match registry.lookup(name) {
        Ok(target) => {
            if !target.push(value) {
                log::warn!(
                    "queue '{}': routed value dropped, target '{}' no longer accepts values",
                    source_id,
                    name
                );
            }
        }
        Err(err) => log_error_with_context(&err, "routed value delivery"),
    }
}

/// Routes a copy of each value to the named queue(s) chosen by the
/// selector. Nothing reaches the stage's own downstream.
struct BranchDriver {
    selector: UnaryFn,
    binding: Option<StageBinding>,
}

impl StageDriver for BranchDriver {
    fn bind(&mut self, binding: StageBinding) {
        self.binding = Some(binding);
    }

    fn process(&mut self, value: Value, done: StageDone) {
        let Some(binding) = self.binding.as_ref() else {
            done.done();
            return;
        };
        let registry = binding.registry.clone();
        let source_id = binding.this_id();
        let original = value.clone();

        self.selector.invoke(
            value,
            Completion::new(move |targets| {
                let names: Vec<String> = match targets {
                    Value::Str(name) => vec![name],
                    Value::Seq(items) => items
                        .into_iter()
                        .filter_map(|item| match item {
                            Value::Str(name) => Some(name),
                            other => {
                                log::warn!(
                                    "queue '{}': branch selector produced a {} target, skipped",
                                    source_id,
                                    other.type_name()
                                );
                                None
                            }
                        })
                        .collect(),
                    other => {
                        log::warn!(
                            "queue '{}': branch selector returned a {} instead of a queue \
                             name, value dropped",
                            source_id,
                            other.type_name()
                        );
                        Vec::new()
                    }
                };

                for name in names {
                    route_to(&registry, &name, original.clone(), &source_id);
                }
                done.done();
            }),
        );
    }
}

/// Forwards every value to a fixed set of named queues, unconditionally.
struct ChainDriver {
    targets: Vec<String>,
    binding: Option<StageBinding>,
}

impl StageDriver for ChainDriver {
    fn bind(&mut self, binding: StageBinding) {
        self.binding = Some(binding);
    }

    fn process(&mut self, value: Value, done: StageDone) {
        if let Some(binding) = self.binding.as_ref() {
            let source_id = binding.this_id();
            for name in &self.targets {
                route_to(&binding.registry, name, value.clone(), &source_id);
            }
        }
        done.done();
    }
}

impl Queue {
    /// Route each value into the named queue(s) the selector returns
    /// (a string name or a sequence of names). The returned downstream
    /// queue receives nothing.
    pub fn branch(&self, selector: UnaryFn) -> Queue {
        self.attach(Box::new(BranchDriver {
            selector,
            binding: None,
        }))
    }

    /// Forward every value into the given named queue(s),
    /// unconditionally. Close/kill are not propagated to the targets.
    pub fn chain<I, S>(&self, targets: I) -> Queue
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attach(Box::new(ChainDriver {
            targets: targets.into_iter().map(Into::into).collect(),
            binding: None,
        }))
    }
}
