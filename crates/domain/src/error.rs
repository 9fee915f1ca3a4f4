//! Domain error types

use thiserror::Error;

/// Domain-level errors that can occur during validation or processing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The HTTP method is not supported.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// The user is not in the registry.
    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// The user is known but holds no credentials.
    #[error("user is not logged in: {0}")]
    UserNotLoggedIn(String),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
