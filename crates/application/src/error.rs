//! Session error taxonomy
//!
//! Every failure surfaced by the session layer is one of these variants, so
//! callers can branch on "needs re-login", "transient network issue" and
//! "bad request" without inspecting messages.

use tether_domain::{DomainError, ServiceErrorCode, ServiceErrorPayload, StatusCode, UserId};
use thiserror::Error;

use crate::ports::{StorageError, TransportError};

/// A non-2xx response, with its decoded error payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("request failed ({status}): [{}] {}", .payload.error_code, .payload.error)]
pub struct RequestError {
    /// Response status.
    pub status: StatusCode,
    /// Service-defined error body.
    pub payload: ServiceErrorPayload,
}

impl RequestError {
    /// Creates a request error.
    #[must_use]
    pub const fn new(status: StatusCode, payload: ServiceErrorPayload) -> Self {
        Self { status, payload }
    }

    /// Returns the service error code.
    #[must_use]
    pub const fn service_error_code(&self) -> &ServiceErrorCode {
        &self.payload.error_code
    }

    /// Returns true if the backend rejected the session.
    #[must_use]
    pub const fn is_invalid_session(&self) -> bool {
        self.payload.error_code.is_invalid_session()
    }
}

/// Errors raised by the session layer.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No response could be obtained; never auth-related.
    #[error("transport error: {0}")]
    Transport(TransportError),

    /// The backend answered with a non-2xx status.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// The session was invalidated and the user has been logged out.
    #[error("session for user {user_id} is no longer valid; log in again")]
    InvalidSession {
        /// The user that was logged out.
        user_id: UserId,
    },

    /// An authenticated operation was attempted with no active user.
    #[error("must authenticate first")]
    MustAuthenticateFirst,

    /// The user is not in the registry.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// The user is known but logged out.
    #[error("user is not logged in: {0}")]
    UserNotLoggedIn(UserId),

    /// The transport cannot open server-push streams.
    #[error("streaming is not supported by this transport")]
    StreamingNotSupported,

    /// The user registry could not be loaded or saved.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A response body did not have the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The client configuration is invalid.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl SessionError {
    /// Returns true if the error is an invalid-session condition, either
    /// already handled (forced logout) or reported by the backend.
    #[must_use]
    pub const fn is_invalid_session(&self) -> bool {
        match self {
            Self::InvalidSession { .. } => true,
            Self::Request(error) => error.is_invalid_session(),
            _ => false,
        }
    }

    /// Returns true if the caller has to log in before retrying.
    #[must_use]
    pub const fn needs_login(&self) -> bool {
        matches!(
            self,
            Self::InvalidSession { .. } | Self::MustAuthenticateFirst | Self::UserNotLoggedIn(_)
        )
    }

    /// Returns true for network-level failures worth retrying later.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns the request error, if this is one.
    #[must_use]
    pub const fn as_request_error(&self) -> Option<&RequestError> {
        match self {
            Self::Request(error) => Some(error),
            _ => None,
        }
    }

    pub(crate) fn decode(error: impl std::fmt::Display) -> Self {
        Self::Decode(error.to_string())
    }
}

impl From<TransportError> for SessionError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::StreamingNotSupported => Self::StreamingNotSupported,
            other => Self::Transport(other),
        }
    }
}

impl From<DomainError> for SessionError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::UnknownUser(id) => Self::UserNotFound(id.into()),
            DomainError::UserNotLoggedIn(id) => Self::UserNotLoggedIn(id.into()),
            other => Self::Configuration(other.to_string()),
        }
    }
}

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
