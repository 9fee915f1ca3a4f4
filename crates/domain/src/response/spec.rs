//! Response specification type
//!
//! Contains the transport-level response value and a small status code
//! wrapper used to classify it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::request::Headers;

/// HTTP status code with semantic helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusCode(pub u16);

impl StatusCode {
    /// Creates a new `StatusCode`.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric status code.
    #[must_use]
    pub const fn as_u16(&self) -> u16 {
        self.0
    }

    /// Returns true if this is a 2xx success status.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// Returns true if this is a 4xx client error status.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.0 >= 400 && self.0 < 500
    }

    /// Returns true if this is a 5xx server error status.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.0 >= 500 && self.0 < 600
    }

    /// Returns the canonical reason phrase for common status codes.
    #[must_use]
    pub const fn reason_phrase(&self) -> &'static str {
        match self.0 {
            200 => "OK",
            201 => "Created",
            204 => "No Content",
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            409 => "Conflict",
            429 => "Too Many Requests",
            500 => "Internal Server Error",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            504 => "Gateway Timeout",
            _ => "Unknown",
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.0, self.reason_phrase())
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

/// A response as returned by a transport round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: StatusCode,
    /// Response headers
    pub headers: Headers,
    /// Raw response body
    pub body: Vec<u8>,
}

impl Response {
    /// Creates a new response.
    #[must_use]
    pub fn new(status: impl Into<StatusCode>, headers: Headers, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: status.into(),
            headers,
            body: body.into(),
        }
    }

    /// Creates a response with a JSON body and no headers.
    #[must_use]
    pub fn json(status: impl Into<StatusCode>, document: &serde_json::Value) -> Self {
        Self::new(status, Headers::new(), document.to_string())
    }

    /// Returns the body as text, replacing invalid UTF-8.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the serde error if the body does not match `T`.
    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}
