//! Synchronization utilities for robust lock handling
//!
//! Converts lock poisoning into application-specific errors so the
//! fallible API paths report a consistent error instead of panicking a
//! second time.

use std::sync::{LockResult, RwLockReadGuard, RwLockWriteGuard};

/// Handle poisoned mutex cases with consistent error handling
///
/// Converts mutex poison errors into application-specific errors using a
/// provided error constructor.
///
/// # Arguments
/// * `result` - The result from a mutex lock operation
/// * `error_constructor` - Function to create the appropriate error type
///
/// # Returns
/// The lock guard on success, or an application error on poison/failure
pub fn handle_mutex_poison<T, E>(
    result: LockResult<T>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<T, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (mutex poisoned). This indicates a panic occurred while holding a lock. PoisonError: {:?}",
            poison_err
        ))
    })
}

/// Handle poisoned RwLock read operations with consistent error handling
pub fn handle_rwlock_read<T, E>(
    result: LockResult<RwLockReadGuard<T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<RwLockReadGuard<T>, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (RwLock read poisoned). This indicates a panic occurred while holding a write lock. PoisonError: {:?}",
            poison_err
        ))
    })
}

/// Handle poisoned RwLock write operations with consistent error handling
pub fn handle_rwlock_write<T, E>(
    result: LockResult<RwLockWriteGuard<T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<RwLockWriteGuard<T>, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (RwLock write poisoned). This indicates a panic occurred while holding the lock. PoisonError: {:?}",
            poison_err
        ))
    })
}
