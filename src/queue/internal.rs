//! Internal queue state machine and pump
//!
//! This module owns the lifecycle state machine
//! (`open -> closing -> closed`, with `killed` reachable from any
//! non-terminal state), the buffered pull/process protocol and the
//! single-in-flight invariant. The pump is deliberately lock-light: the
//! core mutex is held only to inspect and update bookkeeping, never while
//! stage functions or event listeners run, so stage code is free to push
//! into any queue — including its own — without deadlocking.

use std::sync::{Arc, Mutex};

use crate::events::{ListenerSet, QueueEvent, QueueEventKind};
use crate::ops::{StageBinding, StageDone, StageDriver};
use crate::queue::handle::Queue;
use crate::queue::registry::QueueRegistry;
use crate::queue::strategy::QueueBuffer;
use crate::queue::QueueStats;

/// Lifecycle states of a queue.
///
/// `Closed` and `Killed` are terminal; `Closing` rejects new pushes but
/// continues draining buffered values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum LifecycleState {
    Open,
    Closing,
    Closed,
    Killed,
}

/// The stage attached to a queue plus the anonymous queue receiving its
/// output. `driver` is `None` only while an invocation is on the stack.
pub(crate) struct StageSlot {
    driver: Option<Box<dyn StageDriver>>,
    downstream: Queue,
}

pub(crate) struct CoreState {
    state: LifecycleState,
    buffer: Box<dyn QueueBuffer>,
    in_flight: bool,
    /// Re-entrancy guard: true while a pump loop is draining this queue.
    pumping: bool,
    close_on_empty: bool,
    /// Bumped by `kill()`; completions from an older epoch are discarded.
    epoch: u64,
    processed: u64,
    stage: Option<StageSlot>,
    /// Directly-owned downstream queues; close/kill propagate to these
    /// and only these.
    owned: Vec<Queue>,
}

impl CoreState {
    fn runnable(&self) -> bool {
        matches!(self.state, LifecycleState::Open | LifecycleState::Closing)
    }

    fn has_runnable_stage(&self) -> bool {
        self.stage
            .as_ref()
            .map_or(false, |slot| slot.driver.is_some())
    }

    fn settle_ready(&self) -> bool {
        self.state == LifecycleState::Closing && self.buffer.is_empty() && !self.in_flight
    }
}

/// Shared queue internals behind the public [`Queue`] handle.
pub(crate) struct QueueInner {
    id: String,
    registry: QueueRegistry,
    core: Mutex<CoreState>,
    listeners: ListenerSet,
}

/// One pump-loop decision, taken under the core lock and acted on
/// outside it.
enum Step {
    Invoke {
        value: crate::value::Value,
        epoch: u64,
        driver: Box<dyn StageDriver>,
        emptied: bool,
        remaining: usize,
    },
    Settle,
    Idle,
}

impl QueueInner {
    pub(crate) fn new(
        id: String,
        registry: QueueRegistry,
        buffer: Box<dyn QueueBuffer>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            registry,
            core: Mutex::new(CoreState {
                state: LifecycleState::Open,
                buffer,
                in_flight: false,
                pumping: false,
                close_on_empty: false,
                epoch: 0,
                processed: 0,
                stage: None,
                owned: Vec::new(),
            }),
            listeners: ListenerSet::new(),
        })
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn listeners(&self) -> &ListenerSet {
        &self.listeners
    }

    pub(crate) fn registry(&self) -> &QueueRegistry {
        &self.registry
    }

    pub(crate) fn state(&self) -> LifecycleState {
        self.core.lock().unwrap().state
    }

    pub(crate) fn len(&self) -> usize {
        self.core.lock().unwrap().buffer.len()
    }

    pub(crate) fn stats_of(core: &CoreState) -> QueueStats {
        QueueStats {
            depth: core.buffer.len(),
            processed: core.processed,
            state: core.state,
            in_flight: core.in_flight,
        }
    }

    pub(crate) fn lock_core(&self) -> std::sync::LockResult<std::sync::MutexGuard<'_, CoreState>> {
        self.core.lock()
    }

    /// Enqueue one value, firing the cancelable `push` event first.
    pub(crate) fn push_value(
        inner: &Arc<Self>,
        value: crate::value::Value,
    ) -> crate::queue::QueueResult<()> {
        use crate::queue::QueueError;

        let size = {
            let core = inner.core.lock().unwrap();
            if core.state != LifecycleState::Open {
                return Err(QueueError::QueueClosed {
                    queue_id: inner.id.clone(),
                    state: core.state.to_string(),
                });
            }
            core.buffer.len()
        };

        let event =
            QueueEvent::with_value(QueueEventKind::Push, inner.id.clone(), value.clone(), size);
        if !inner.listeners.dispatch(&event) {
            return Err(QueueError::PushVetoed {
                queue_id: inner.id.clone(),
            });
        }

        {
            let mut core = inner.core.lock().unwrap();
            // A listener may have closed or killed the queue mid-dispatch.
            if core.state != LifecycleState::Open {
                return Err(QueueError::QueueClosed {
                    queue_id: inner.id.clone(),
                    state: core.state.to_string(),
                });
            }
            core.buffer.enqueue(value);
        }

        Self::pump(inner);
        Ok(())
    }

    /// Drive the pull/process protocol until the queue goes idle.
    ///
    /// Dequeues one value at a time, fires `pull` (and `empty` when the
    /// dequeue drained the buffer), and invokes the attached stage via
    /// [`StageDone`]. Nested calls while a loop is already draining are
    /// no-ops; the active loop picks up whatever they would have done.
    pub(crate) fn pump(inner: &Arc<Self>) {
        {
            let mut core = inner.core.lock().unwrap();
            if core.pumping {
                return;
            }
            core.pumping = true;
        }

        loop {
            let step = {
                let mut core = inner.core.lock().unwrap();
                if !core.runnable() || core.in_flight {
                    core.pumping = false;
                    Step::Idle
                } else if core.has_runnable_stage() && !core.buffer.is_empty() {
                    let value = core.buffer.dequeue().unwrap();
                    core.in_flight = true;
                    let driver = core.stage.as_mut().unwrap().driver.take().unwrap();
                    Step::Invoke {
                        value,
                        epoch: core.epoch,
                        driver,
                        emptied: core.buffer.is_empty(),
                        remaining: core.buffer.len(),
                    }
                } else if core.close_on_empty
                    && core.state == LifecycleState::Open
                    && core.buffer.is_empty()
                {
                    core.state = LifecycleState::Closing;
                    core.pumping = false;
                    Step::Settle
                } else if core.settle_ready() {
                    core.pumping = false;
                    Step::Settle
                } else {
                    core.pumping = false;
                    Step::Idle
                }
            };

            match step {
                Step::Idle => return,
                Step::Settle => {
                    Self::try_settle_closed(inner);
                    return;
                }
                Step::Invoke {
                    value,
                    epoch,
                    mut driver,
                    emptied,
                    remaining,
                } => {
                    let pull = QueueEvent::with_value(
                        QueueEventKind::Pull,
                        inner.id.clone(),
                        value.clone(),
                        remaining,
                    );
                    inner.listeners.dispatch(&pull);

                    if emptied {
                        let empty = QueueEvent::new(QueueEventKind::Empty, inner.id.clone(), 0);
                        inner.listeners.dispatch(&empty);

                        let begin = {
                            let mut core = inner.core.lock().unwrap();
                            if core.close_on_empty && core.state == LifecycleState::Open {
                                core.state = LifecycleState::Closing;
                                true
                            } else {
                                false
                            }
                        };
                        if begin {
                            log::debug!("queue '{}' closing (buffer drained)", inner.id);
                        }
                    }

                    let done = StageDone::new(Arc::clone(inner), epoch);
                    driver.process(value, done);

                    let mut core = inner.core.lock().unwrap();
                    if let Some(slot) = core.stage.as_mut() {
                        slot.driver = Some(driver);
                    }
                    // If the stage slot is gone the queue was killed and
                    // the driver is dropped here with it.
                }
            }
        }
    }

    /// Deliver a stage invocation's outputs and release the in-flight
    /// slot. Invocations from a pre-kill epoch are discarded whole.
    pub(crate) fn complete_stage(
        inner: &Arc<Self>,
        epoch: u64,
        outputs: Vec<crate::value::Value>,
    ) {
        let downstream = {
            let mut core = inner.core.lock().unwrap();
            if core.epoch != epoch || core.state == LifecycleState::Killed {
                log::trace!(
                    "queue '{}': discarding stage completion from a previous epoch",
                    inner.id
                );
                return;
            }
            core.processed += 1;
            core.stage.as_ref().map(|slot| slot.downstream.clone())
        };

        if let Some(downstream) = downstream {
            for value in outputs {
                downstream.push(value);
            }
        }

        {
            let mut core = inner.core.lock().unwrap();
            if core.epoch != epoch {
                return;
            }
            core.in_flight = false;
        }

        Self::pump(inner);
    }

    /// Attempt the `closing -> closed` transition: dispatch the
    /// cancelable `close` event, then propagate to owned queues and run
    /// the stage finalizer.
    fn try_settle_closed(inner: &Arc<Self>) {
        {
            let core = inner.core.lock().unwrap();
            if !core.settle_ready() {
                return;
            }
        }

        let event = QueueEvent::new(QueueEventKind::Close, inner.id.clone(), 0);
        if !inner.listeners.dispatch(&event) {
            log::debug!("queue '{}': close transition canceled by listener", inner.id);
            return;
        }

        let (slot, owned) = {
            let mut core = inner.core.lock().unwrap();
            if !core.settle_ready() {
                return; // a listener re-opened the race; stay closing
            }
            core.state = LifecycleState::Closed;
            (core.stage.take(), std::mem::take(&mut core.owned))
        };
        log::debug!("queue '{}' closed", inner.id);

        for child in &owned {
            child.close();
        }

        if let Some(mut slot) = slot {
            if let Some(mut driver) = slot.driver.take() {
                driver.finish();
            }
        }
    }

    pub(crate) fn close(inner: &Arc<Self>) {
        {
            let mut core = inner.core.lock().unwrap();
            match core.state {
                LifecycleState::Open => core.state = LifecycleState::Closing,
                LifecycleState::Closing => {}
                LifecycleState::Closed | LifecycleState::Killed => return,
            }
        }
        log::debug!("queue '{}' closing", inner.id);
        Self::pump(inner);
    }

    pub(crate) fn close_on_empty(inner: &Arc<Self>) {
        {
            let mut core = inner.core.lock().unwrap();
            if matches!(core.state, LifecycleState::Closed | LifecycleState::Killed) {
                return;
            }
            core.close_on_empty = true;
        }
        Self::pump(inner);
    }

    /// Immediate, non-cooperative teardown: discards the buffer, drops
    /// the stage, and propagates `kill` to owned queues. A stage
    /// invocation already running cannot be interrupted; its eventual
    /// completion is discarded by the epoch check.
    pub(crate) fn kill(inner: &Arc<Self>) {
        let owned = {
            let mut core = inner.core.lock().unwrap();
            if matches!(core.state, LifecycleState::Closed | LifecycleState::Killed) {
                return;
            }
            core.state = LifecycleState::Killed;
            core.buffer.clear();
            core.epoch += 1;
            core.in_flight = false;
            core.stage = None;
            std::mem::take(&mut core.owned)
        };
        log::debug!("queue '{}' killed", inner.id);

        let event = QueueEvent::new(QueueEventKind::Kill, inner.id.clone(), 0);
        inner.listeners.dispatch(&event);

        for child in owned {
            child.kill();
        }
    }

    /// Attach a stage driver, creating and returning the anonymous queue
    /// that receives the stage's output.
    ///
    /// # Panics
    ///
    /// Attaching a second stage to a queue is a construction error and
    /// panics.
    pub(crate) fn attach(inner: &Arc<Self>, mut driver: Box<dyn StageDriver>) -> Queue {
        let downstream = inner.registry.queue();
        driver.bind(StageBinding {
            this: Queue::from_inner(Arc::clone(inner)).downgrade(),
            downstream: downstream.clone(),
            registry: inner.registry.clone(),
        });

        enum AttachOutcome {
            Attached,
            Terminal(LifecycleState),
            AlreadyStaged,
        }

        let outcome = {
            let mut core = inner.core.lock().unwrap();
            match core.state {
                LifecycleState::Closed | LifecycleState::Killed => {
                    AttachOutcome::Terminal(core.state)
                }
                LifecycleState::Open | LifecycleState::Closing => {
                    if core.stage.is_some() {
                        AttachOutcome::AlreadyStaged
                    } else {
                        core.stage = Some(StageSlot {
                            driver: Some(driver),
                            downstream: downstream.clone(),
                        });
                        core.owned.push(downstream.clone());
                        AttachOutcome::Attached
                    }
                }
            }
        };

        match outcome {
            AttachOutcome::AlreadyStaged => {
                panic!("queue '{}' already has a stage attached", inner.id);
            }
            AttachOutcome::Terminal(LifecycleState::Killed) => {
                log::warn!(
                    "queue '{}': stage attached after kill; downstream starts killed",
                    inner.id
                );
                downstream.kill();
            }
            AttachOutcome::Terminal(_) => {
                log::warn!(
                    "queue '{}': stage attached after close; downstream starts closed",
                    inner.id
                );
                downstream.close();
            }
            AttachOutcome::Attached => {
                log::trace!("queue '{}': stage attached", inner.id);
                Self::pump(inner);
            }
        }

        downstream
    }
}
