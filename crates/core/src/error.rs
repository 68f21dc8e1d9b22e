//! Error types for the dispatch-core domain logic

use thiserror::Error;

use crate::types::NotificationId;

/// Core domain errors: validation, store conflicts, registry setup.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("notification not found: {0}")]
    NotFound(NotificationId),

    #[error("idempotency key already in use: {0}")]
    IdempotencyConflict(String),

    #[error("invalid notification data: {0}")]
    InvalidData(String),

    #[error("duplicate provider registered for platform: {0}")]
    DuplicateProvider(String),

    #[error("no provider registered for platform: {0}")]
    PlatformNotSupported(String),
}

/// Result type alias for core domain operations.
pub type CoreResult<T> = Result<T, CoreError>;
