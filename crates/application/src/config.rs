//! Client configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tether_domain::AppInfo;
use tether_domain::request::DEFAULT_TIMEOUT_MS;

use crate::error::{SessionError, SessionResult};

const fn default_request_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Largest accepted `refresh_buffer_secs`: one day.
pub const MAX_REFRESH_BUFFER_SECS: i64 = 86_400;

const fn default_refresh_buffer_secs() -> i64 {
    60
}

/// Settings for one app client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend base URL, e.g. `https://backend.example.com`.
    pub base_url: String,
    /// Identifier of the backend app.
    pub client_app_id: String,
    /// Name of the local application, reported on login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_app_name: Option<String>,
    /// Version of the local application, reported on login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_app_version: Option<String>,
    /// Timeout applied to requests that do not set their own.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Where the user registry is stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,
    /// How close to expiry a JWT access token is refreshed before use.
    #[serde(default = "default_refresh_buffer_secs")]
    pub refresh_buffer_secs: i64,
}

impl ClientConfig {
    /// Creates a config with defaults for everything but the backend.
    #[must_use]
    pub fn new(base_url: impl Into<String>, client_app_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client_app_id: client_app_id.into(),
            local_app_name: None,
            local_app_version: None,
            request_timeout_ms: default_request_timeout_ms(),
            storage_path: None,
            refresh_buffer_secs: default_refresh_buffer_secs(),
        }
    }

    /// Checks the config.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Configuration` if the base URL is not an
    /// http(s) URL, the app id is empty, the timeout is zero, or the refresh
    /// buffer is outside `0..=MAX_REFRESH_BUFFER_SECS`.
    pub fn validate(&self) -> SessionResult<()> {
        let url = url::Url::parse(&self.base_url).map_err(|e| {
            SessionError::Configuration(format!("invalid base_url '{}': {e}", self.base_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SessionError::Configuration(format!(
                "base_url must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.client_app_id.trim().is_empty() {
            return Err(SessionError::Configuration(
                "client_app_id must not be empty".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(SessionError::Configuration(
                "request_timeout_ms must be positive".to_string(),
            ));
        }
        if !(0..=MAX_REFRESH_BUFFER_SECS).contains(&self.refresh_buffer_secs) {
            return Err(SessionError::Configuration(format!(
                "refresh_buffer_secs must be between 0 and {MAX_REFRESH_BUFFER_SECS}, got {}",
                self.refresh_buffer_secs
            )));
        }
        Ok(())
    }

    /// App info reported on login.
    #[must_use]
    pub fn app_info(&self) -> AppInfo {
        AppInfo {
            client_app_id: self.client_app_id.clone(),
            local_app_name: self.local_app_name.clone(),
            local_app_version: self.local_app_version.clone(),
        }
    }
}
