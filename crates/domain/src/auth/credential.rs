//! Login credentials, one variant per authentication provider.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Kind of provider a user authenticated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Anonymous login, no identity attached.
    Anonymous,
    /// Username and password.
    UserPassword,
    /// Server or user API key.
    ApiKey,
    /// Externally signed token.
    Custom,
}

impl ProviderKind {
    /// Provider type string understood by the backend.
    #[must_use]
    pub const fn provider_type(self) -> &'static str {
        match self {
            Self::Anonymous => "anon-user",
            Self::UserPassword => "local-userpass",
            Self::ApiKey => "api-key",
            Self::Custom => "custom-token",
        }
    }
}

/// Material presented to a provider's login route.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Anonymous login.
    Anonymous,
    /// Username/password login.
    UserPassword {
        /// Username (usually an email address).
        username: String,
        /// Password.
        password: String,
    },
    /// Server API key login.
    ServerApiKey {
        /// The key.
        key: String,
    },
    /// User API key login.
    UserApiKey {
        /// The key.
        key: String,
    },
    /// Custom token login.
    Custom {
        /// Signed token.
        token: String,
    },
}

impl Credential {
    /// Creates a username/password credential.
    #[must_use]
    pub fn user_password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::UserPassword {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the provider kind.
    #[must_use]
    pub const fn provider_kind(&self) -> ProviderKind {
        match self {
            Self::Anonymous => ProviderKind::Anonymous,
            Self::UserPassword { .. } => ProviderKind::UserPassword,
            Self::ServerApiKey { .. } | Self::UserApiKey { .. } => ProviderKind::ApiKey,
            Self::Custom { .. } => ProviderKind::Custom,
        }
    }

    /// Provider name used in the login route.
    #[must_use]
    pub const fn provider_name(&self) -> &'static str {
        self.provider_kind().provider_type()
    }

    /// Provider-specific body fields for the login request.
    #[must_use]
    pub fn material(&self) -> serde_json::Value {
        match self {
            Self::Anonymous => json!({}),
            Self::UserPassword { username, password } => {
                json!({ "username": username, "password": password })
            }
            Self::ServerApiKey { key } | Self::UserApiKey { key } => json!({ "key": key }),
            Self::Custom { token } => json!({ "token": token }),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::UserPassword { username, .. } => f
                .debug_struct("UserPassword")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::ServerApiKey { .. } => f.write_str("ServerApiKey"),
            Self::UserApiKey { .. } => f.write_str("UserApiKey"),
            Self::Custom { .. } => f.write_str("Custom"),
        }
    }
}
