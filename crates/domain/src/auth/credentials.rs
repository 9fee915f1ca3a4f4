//! Credential Set: the token material for one authenticated user.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a backend user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a user id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Tokens and identifiers issued by a successful login.
///
/// A value type: refreshing or logging out replaces the whole set rather
/// than editing fields in place.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSet {
    /// The authenticated user.
    #[serde(alias = "userId")]
    pub user_id: UserId,
    /// The device this session is bound to.
    #[serde(alias = "deviceId")]
    pub device_id: String,
    /// Short-lived token sent with every authenticated request.
    #[serde(alias = "accessToken")]
    pub access_token: String,
    /// Long-lived token used to mint new access tokens.
    #[serde(
        default,
        alias = "refreshToken",
        skip_serializing_if = "Option::is_none"
    )]
    pub refresh_token: Option<String>,
}

impl CredentialSet {
    /// Creates a credential set.
    #[must_use]
    pub fn new(
        user_id: impl Into<UserId>,
        device_id: impl Into<String>,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            device_id: device_id.into(),
            access_token: access_token.into(),
            refresh_token,
        }
    }

    /// Returns a new set with only the access token replaced.
    #[must_use]
    pub fn with_access_token(&self, access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            ..self.clone()
        }
    }

    /// Returns true if a refresh token is available.
    #[must_use]
    pub const fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("user_id", &self.user_id)
            .field("device_id", &self.device_id)
            .field("access_token", &token_preview(&self.access_token))
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}

/// Shortens a token for logs (first 8 chars + `...`).
#[must_use]
pub fn token_preview(token: &str) -> String {
    match token.char_indices().nth(8) {
        Some((cut, _)) if token.len() > 12 => format!("{}...", &token[..cut]),
        _ => token.to_string(),
    }
}
