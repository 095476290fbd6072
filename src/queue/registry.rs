//! QueueRegistry - named-queue coordination
//!
//! The registry is the process boundary for queue names: independently
//! defined chains reference each other exclusively through it. It is an
//! explicit, clonable object rather than a process-wide singleton, so
//! embedders (and tests) create as many isolated registries as they need
//! and reset them freely.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::core::sync::{handle_rwlock_read, handle_rwlock_write};
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::handle::Queue;
use crate::queue::internal::QueueInner;
use crate::queue::strategy::{FifoStrategy, QueueStrategy};
use crate::queue::RegistryStats;
use crate::value::Value;

/// Central registry mapping names to queue instances.
///
/// Named queues are created lazily on first lookup and owned by the
/// registry until evicted or the registry is dropped. Anonymous queues
/// (operator downstreams, `queue()`/`queue_from()`) are created through
/// the registry too so they share its default construction strategy.
///
/// # Thread Safety
///
/// The registry is fully thread-safe; clones share one name table.
///
/// # Example
///
/// ```rust,no_run
/// use flowline::queue::QueueRegistry;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = QueueRegistry::new();
/// let results = registry.lookup("results")?;
/// results.push(1i64);
///
/// // A second lookup returns the same queue.
/// assert_eq!(registry.lookup("results")?.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct QueueRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    named: RwLock<HashMap<String, Queue>>,
    default_strategy: Box<dyn QueueStrategy>,
    next_anon: AtomicU64,
}

impl QueueRegistry {
    /// Registry whose queues use strict FIFO delivery.
    pub fn new() -> Self {
        Self::with_strategy(FifoStrategy)
    }

    /// Registry with an alternative default construction strategy.
    pub fn with_strategy(strategy: impl QueueStrategy + 'static) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                named: RwLock::new(HashMap::new()),
                default_strategy: Box::new(strategy),
                next_anon: AtomicU64::new(0),
            }),
        }
    }

    fn make_queue(&self, id: String, strategy: &dyn QueueStrategy) -> Queue {
        Queue::from_inner(QueueInner::new(id, self.clone(), strategy.make_buffer()))
    }

    /// Create an anonymous queue that stays open until closed or killed.
    pub fn queue(&self) -> Queue {
        let n = self.inner.next_anon.fetch_add(1, Ordering::SeqCst);
        self.make_queue(format!("anon-{}", n), self.inner.default_strategy.as_ref())
    }

    /// Create an eager anonymous queue from a fixed set of initial
    /// values; it auto-closes once the attached stage chain has drained
    /// them. An empty set yields an immediately-closed queue.
    pub fn queue_from<I, V>(&self, values: I) -> Queue
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let queue = self.queue();
        queue.push_all(values);
        queue.close_on_empty();
        queue
    }

    /// Look up a named queue, creating it with the registry's default
    /// strategy if absent.
    pub fn lookup(&self, name: &str) -> QueueResult<Queue> {
        self.lookup_with(name, self.inner.default_strategy.as_ref())
    }

    /// Look up a named queue, creating it with `strategy` if absent.
    ///
    /// The first caller wins: if the queue already exists the supplied
    /// strategy has no effect.
    pub fn lookup_with(&self, name: &str, strategy: &dyn QueueStrategy) -> QueueResult<Queue> {
        {
            let named = handle_rwlock_read(self.inner.named.read(), |message| {
                QueueError::OperationFailed { message }
            })?;
            if let Some(queue) = named.get(name) {
                return Ok(queue.clone());
            }
        }

        let mut named = handle_rwlock_write(self.inner.named.write(), |message| {
            QueueError::OperationFailed { message }
        })?;
        // Double-check: another caller may have created it meanwhile.
        if let Some(queue) = named.get(name) {
            return Ok(queue.clone());
        }

        let queue = self.make_queue(name.to_string(), strategy);
        named.insert(name.to_string(), queue.clone());
        log::debug!(
            "registry: created named queue '{}' ({})",
            name,
            strategy.name()
        );
        Ok(queue)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner
            .named
            .read()
            .map(|named| named.contains_key(name))
            .unwrap_or(false)
    }

    /// Names of all registered queues.
    pub fn names(&self) -> QueueResult<Vec<String>> {
        let named = handle_rwlock_read(self.inner.named.read(), |message| {
            QueueError::OperationFailed { message }
        })?;
        Ok(named.keys().cloned().collect())
    }

    /// Number of named queues currently registered.
    pub fn len(&self) -> usize {
        self.inner.named.read().map(|named| named.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove a named queue from the registry. The queue itself is
    /// untouched; existing handles keep working. Returns whether an
    /// entry was removed.
    pub fn evict(&self, name: &str) -> QueueResult<bool> {
        let mut named = handle_rwlock_write(self.inner.named.write(), |message| {
            QueueError::OperationFailed { message }
        })?;
        let removed = named.remove(name).is_some();
        if removed {
            log::debug!("registry: evicted named queue '{}'", name);
        }
        Ok(removed)
    }

    /// Drop every named-queue entry; returns how many were evicted.
    pub fn reset(&self) -> QueueResult<usize> {
        let mut named = handle_rwlock_write(self.inner.named.write(), |message| {
            QueueError::OperationFailed { message }
        })?;
        let evicted = named.len();
        named.clear();
        if evicted > 0 {
            log::debug!("registry: reset, {} named queues evicted", evicted);
        }
        Ok(evicted)
    }

    /// Snapshot of registry bookkeeping.
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            named_queues: self.len(),
            anonymous_created: self.inner.next_anon.load(Ordering::SeqCst),
        }
    }
}

impl Clone for QueueRegistry {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for QueueRegistry {
    fn default() -> Self {
        Self::new()
    }
}
