//! Known users and the read-only view handed to listeners.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CredentialSet, ProviderKind, UserId};

/// A user known to this device, logged in or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    /// User identifier.
    pub user_id: UserId,
    /// Device the last session was bound to.
    pub device_id: String,
    /// Provider used to log in.
    pub provider: ProviderKind,
    /// Current credentials; `None` once logged out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<CredentialSet>,
    /// Last login, switch or refresh involving this user.
    pub last_auth_activity: DateTime<Utc>,
}

impl UserEntry {
    /// Creates a logged-in entry from fresh credentials.
    #[must_use]
    pub fn logged_in(
        credentials: CredentialSet,
        provider: ProviderKind,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: credentials.user_id.clone(),
            device_id: credentials.device_id.clone(),
            provider,
            credentials: Some(credentials),
            last_auth_activity: now,
        }
    }

    /// Returns true if the entry holds credentials.
    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.credentials.is_some()
    }

    /// Returns the listener-facing view of this entry.
    #[must_use]
    pub fn to_user(&self) -> AuthUser {
        AuthUser {
            id: self.user_id.clone(),
            device_id: self.device_id.clone(),
            provider: self.provider,
            logged_in: self.is_logged_in(),
            last_auth_activity: self.last_auth_activity,
        }
    }
}

/// Read-only snapshot of a user, free of token material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// User identifier.
    pub id: UserId,
    /// Device identifier.
    pub device_id: String,
    /// Provider used to log in.
    pub provider: ProviderKind,
    /// Whether the user currently holds credentials.
    pub logged_in: bool,
    /// Last auth activity.
    pub last_auth_activity: DateTime<Utc>,
}
