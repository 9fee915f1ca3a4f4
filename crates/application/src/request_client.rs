//! Request client
//!
//! Turns a logical [`Request`] into a transport round trip and classifies
//! the outcome: 2xx responses are returned, everything else becomes a
//! [`RequestError`] carrying the decoded service error payload.

use std::sync::Arc;

use tether_domain::{BasicRequest, Request, Response, ServiceErrorPayload};
use tracing::debug;

use crate::error::{RequestError, SessionError, SessionResult};
use crate::ports::{EventStream, StreamOpening, Transport};

/// Sends requests relative to a base URL through a [`Transport`].
#[derive(Clone)]
pub struct RequestClient {
    base_url: String,
    transport: Arc<dyn Transport>,
    default_timeout_ms: u64,
}

impl std::fmt::Debug for RequestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestClient")
            .field("base_url", &self.base_url)
            .field("default_timeout_ms", &self.default_timeout_ms)
            .finish_non_exhaustive()
    }
}

impl RequestClient {
    /// Creates a request client.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn Transport>,
        default_timeout_ms: u64,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            transport,
            default_timeout_ms,
        }
    }

    /// Returns the configured base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a request and returns its 2xx response.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Transport` when no response arrives and
    /// `SessionError::Request` for any non-2xx status.
    pub async fn execute(&self, request: &Request) -> SessionResult<Response> {
        let basic = BasicRequest::resolve(&self.base_url, request, self.default_timeout_ms);
        debug!(
            request_id = %request.id,
            method = %basic.method,
            url = %basic.url,
            "sending request"
        );

        let response = self.transport.round_trip(basic).await.map_err(|e| {
            debug!(request_id = %request.id, error = %e, "transport failure");
            SessionError::from(e)
        })?;

        debug!(request_id = %request.id, status = %response.status, "received response");
        inspect_response(response)
    }

    /// Opens a server-push stream for a request.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StreamingNotSupported` when the transport has
    /// no push support, and `SessionError::Request` when the server refuses
    /// the stream with a non-2xx response.
    pub async fn open_stream(&self, request: &Request) -> SessionResult<Box<dyn EventStream>> {
        let basic = BasicRequest::resolve(&self.base_url, request, self.default_timeout_ms);
        debug!(request_id = %request.id, url = %basic.url, "opening stream");

        match self.transport.stream(basic).await? {
            StreamOpening::Open(stream) => Ok(stream),
            StreamOpening::Refused(response) => {
                debug!(request_id = %request.id, status = %response.status, "stream refused");
                Err(into_request_error(&response).into())
            }
        }
    }
}

fn inspect_response(response: Response) -> SessionResult<Response> {
    if response.status.is_success() {
        Ok(response)
    } else {
        Err(into_request_error(&response).into())
    }
}

fn into_request_error(response: &Response) -> RequestError {
    RequestError::new(response.status, ServiceErrorPayload::from_body(&response.body))
}
