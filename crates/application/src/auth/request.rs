//! Authenticated request wrapper.

use tether_domain::Request;

/// A request to be sent with the active user's credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    /// The underlying request; its `Authorization` header is overwritten.
    pub request: Request,
    /// Whether an invalid-session response may trigger one refresh and
    /// retry. Cleared on the retry itself.
    pub refresh_on_failure: bool,
}

impl AuthRequest {
    /// Wraps a request with refresh-on-failure enabled.
    #[must_use]
    pub const fn new(request: Request) -> Self {
        Self {
            request,
            refresh_on_failure: true,
        }
    }

    /// Disables the refresh-and-retry policy for this request.
    #[must_use]
    pub const fn without_refresh_on_failure(mut self) -> Self {
        self.refresh_on_failure = false;
        self
    }
}

impl From<Request> for AuthRequest {
    fn from(request: Request) -> Self {
        Self::new(request)
    }
}
