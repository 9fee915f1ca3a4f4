//! Transport port
//!
//! The transport performs exactly one request/response round trip and has
//! no knowledge of authentication or retries.

use async_trait::async_trait;
use tether_domain::{BasicRequest, Response, StreamEvent};
use thiserror::Error;

/// I/O-level failures raised by a transport.
///
/// None of these are ever related to authentication.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request did not complete in time.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout {
        /// The timeout that elapsed.
        timeout_ms: u64,
    },

    /// The remote host refused the connection.
    #[error("connection refused by {host}:{port}")]
    ConnectionRefused {
        /// Target host.
        host: String,
        /// Target port.
        port: u16,
    },

    /// Host name resolution failed.
    #[error("DNS lookup failed for {host}: {message}")]
    DnsError {
        /// Host that failed to resolve.
        host: String,
        /// Underlying message.
        message: String,
    },

    /// The connection could not be established or broke.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The request URL could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The redirect limit was exceeded.
    #[error("too many redirects (max {max})")]
    TooManyRedirects {
        /// Redirect limit.
        max: u32,
    },

    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),

    /// The transport cannot open server-push streams.
    #[error("streaming is not supported by this transport")]
    StreamingNotSupported,

    /// Any other transport failure.
    #[error("{0}")]
    Other(String),
}

/// A server-push stream of events.
#[async_trait]
pub trait EventStream: Send {
    /// Waits for the next event. Returns `None` once the stream has ended.
    async fn next_event(&mut self) -> Option<Result<StreamEvent, TransportError>>;

    /// Closes the stream; subsequent calls to `next_event` return `None`.
    fn close(&mut self);

    /// Returns true while the stream can still yield events.
    fn is_open(&self) -> bool;
}

/// Result of asking a transport to open a stream.
pub enum StreamOpening {
    /// The server accepted the stream.
    Open(Box<dyn EventStream>),
    /// The server answered with a non-2xx response instead of a stream.
    Refused(Response),
}

impl std::fmt::Debug for StreamOpening {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open(_) => f.write_str("StreamOpening::Open"),
            Self::Refused(response) => f
                .debug_tuple("StreamOpening::Refused")
                .field(&response.status)
                .finish(),
        }
    }
}

/// Port for sending requests to the backend.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a request and returns whatever response arrives, any status.
    ///
    /// # Errors
    ///
    /// Returns a `TransportError` when no response could be obtained.
    async fn round_trip(&self, request: BasicRequest) -> Result<Response, TransportError>;

    /// Opens a server-push event stream.
    ///
    /// Transports without push support keep this default.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::StreamingNotSupported` by default.
    async fn stream(&self, request: BasicRequest) -> Result<StreamOpening, TransportError> {
        let _ = request;
        Err(TransportError::StreamingNotSupported)
    }
}
