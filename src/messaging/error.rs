//! Error types for messaging operations

use crate::error::AppError;

/// Result type for messaging operations
pub type MessagingResult<T> = std::result::Result<T, MessagingError>;

/// Errors that can occur during messaging operations
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    /// Missing or invalid backend configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Connection to the backend failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Publish failed
    #[error("Publish failed: {0}")]
    PublishFailed(String),

    /// Receive failed
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// Delete (acknowledge) failed
    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    /// Named queue does not exist on the backend
    #[error("Queue does not exist: {0}")]
    QueueNotFound(String),

    /// Queue creation or declaration failed
    #[error("Queue creation failed for {queue}: {reason}")]
    QueueCreationFailed { queue: String, reason: String },

    /// Anything else
    #[error("Internal messaging error: {0}")]
    Internal(String),
}

impl MessagingError {
    /// Whether this error is fatal at startup
    pub fn is_configuration(&self) -> bool {
        matches!(self, MessagingError::Configuration(_))
    }
}

impl From<MessagingError> for AppError {
    fn from(err: MessagingError) -> Self {
        match err {
            MessagingError::Configuration(msg) => AppError::Configuration(msg),
            _ => AppError::Internal(err.to_string()),
        }
    }
}
