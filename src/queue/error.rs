//! Queue Error Types

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Queue '{queue_id}' is {state} and no longer accepts values")]
    QueueClosed { queue_id: String, state: String },

    #[error("Push vetoed by a listener on queue '{queue_id}'")]
    PushVetoed { queue_id: String },

    #[error("Operation failed: {message}")]
    OperationFailed { message: String },
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

impl crate::core::error_handling::ContextualError for QueueError {
    fn is_user_actionable(&self) -> bool {
        false // All queue errors are system-level
    }

    fn user_message(&self) -> Option<&str> {
        None
    }
}
