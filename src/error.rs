/// Unified error types for the CodeGenie core
use thiserror::Error;

/// Main error type for the core stores and services
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Email already registered to another user
    #[error("Email already registered")]
    DuplicateEmail,

    /// Login failed. Deliberately carries no detail: an unknown email and a
    /// wrong secret are indistinguishable to the caller.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Not found errors (user or history item)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Promotion would exceed the administrator ceiling
    #[error("Admin limit reached: at most {0} administrators allowed")]
    AdminLimitExceeded(usize),

    /// Feedback has already been attached to this history item
    #[error("Feedback already present on history item")]
    FeedbackAlreadyPresent,

    /// The external generation/explanation engine failed
    #[error("Code engine unavailable: {0}")]
    ServiceUnavailable(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;
