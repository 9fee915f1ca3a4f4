//! Request specification types
//!
//! A [`Request`] is the logical, base-URL-relative description a caller
//! builds. A [`BasicRequest`] is what actually goes to the transport: the
//! same method, headers and body with an absolute URL.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{APPLICATION_JSON, CONTENT_TYPE, Headers, Method};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// A logical request against the backend, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Identifier used to correlate log lines for one logical request.
    pub id: Uuid,
    /// HTTP method
    pub method: Method,
    /// Route path, beginning with `/`
    pub path: String,
    /// HTTP headers
    #[serde(default)]
    pub headers: Headers,
    /// Optional request body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Optional timeout override in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Request {
    /// Creates a request with no headers or body.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            method,
            path: path.into(),
            headers: Headers::new(),
            body: None,
            timeout_ms: None,
        }
    }

    /// Creates a GET request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// Creates a POST request.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// Creates a DELETE request.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Attaches a JSON document as the body and sets the content type.
    #[must_use]
    pub fn with_json(mut self, document: &serde_json::Value) -> Self {
        self.headers.set(CONTENT_TYPE, APPLICATION_JSON);
        self.body = Some(document.to_string());
        self
    }

    /// Sets a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Overrides the timeout.
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

/// A fully-resolved request handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL
    pub url: String,
    /// HTTP headers
    pub headers: Headers,
    /// Optional request body
    pub body: Option<String>,
    /// Timeout in milliseconds
    pub timeout_ms: u64,
}

impl BasicRequest {
    /// Resolves a logical request against a base URL.
    ///
    /// The path is appended verbatim; a trailing slash on the base URL is
    /// dropped so routes may always start with `/`.
    #[must_use]
    pub fn resolve(base_url: &str, request: &Request, default_timeout_ms: u64) -> Self {
        Self {
            method: request.method,
            url: format!("{}{}", base_url.trim_end_matches('/'), request.path),
            headers: request.headers.clone(),
            body: request.body.clone(),
            timeout_ms: request.timeout_ms.unwrap_or(default_timeout_ms),
        }
    }
}
