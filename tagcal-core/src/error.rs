//! Error types for tagcal.

use thiserror::Error;

/// Errors that can occur in tagcal operations.
#[derive(Error, Debug)]
pub enum TagcalError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid recurrence: {0}")]
    InvalidRecurrence(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Permission request failed: {0}")]
    PermissionRequest(String),

    #[error("Unknown notification permission '{0}'")]
    InvalidPermission(String),
}

/// Result type alias for tagcal operations.
pub type TagcalResult<T> = Result<T, TagcalError>;
