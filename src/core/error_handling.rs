//! Generic error handling utilities
//!
//! Provides unified error handling that can work across different error
//! types while maintaining consistent error logging patterns.

/// Trait for errors that can distinguish between user-actionable and
/// system errors
///
/// This trait enables generic error handling functions to determine
/// whether an error should show specific user messages or generic
/// context with debug details.
///
/// # Implementation Consistency
/// **IMPORTANT**: When `is_user_actionable()` returns `true`,
/// `user_message()` should return `Some(message)` with a helpful,
/// actionable message. When `is_user_actionable()` returns `false`,
/// `user_message()` should return `None`.
pub trait ContextualError: std::error::Error {
    /// Returns true if this error contains a specific, user-actionable
    /// message that should be displayed directly to the user
    fn is_user_actionable(&self) -> bool;

    /// Returns the specific user message if this is a user-actionable
    /// error
    fn user_message(&self) -> Option<&str>;
}

/// Log errors with appropriate detail level based on error specificity
///
/// - Specific messages for user-actionable errors (preserves detail)
/// - Generic context with debug details for system errors
/// - Consistent error formatting across all modules
pub fn log_error_with_context<E: ContextualError + std::fmt::Display + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    if error.is_user_actionable() {
        if let Some(user_msg) = error.user_message() {
            log::error!("{}: {}", operation_context, user_msg);
        } else {
            log::error!("{}: {}", operation_context, error);
        }
    } else {
        log::error!("{}: {}", operation_context, error);
    }
    log::debug!("DEBUG_DETAILS: {:?}", error);
}
