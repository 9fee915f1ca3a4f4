//! User Registry: the ordered set of known users plus the active pointer.

use serde::{Deserialize, Serialize};

use super::{CredentialSet, ProviderKind, UserEntry, UserId};
use crate::error::{DomainError, DomainResult};

/// Current on-disk schema version.
pub const REGISTRY_SCHEMA_VERSION: u32 = 1;

/// Ordered, user-id-unique collection of known users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRegistry {
    /// Schema version of the persisted document.
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    active_user_id: Option<UserId>,
    #[serde(default)]
    users: Vec<UserEntry>,
}

impl Default for UserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl UserRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            schema_version: REGISTRY_SCHEMA_VERSION,
            active_user_id: None,
            users: Vec::new(),
        }
    }

    /// All known users in insertion order.
    #[must_use]
    pub fn users(&self) -> &[UserEntry] {
        &self.users
    }

    /// Looks up a user.
    #[must_use]
    pub fn get(&self, user_id: &UserId) -> Option<&UserEntry> {
        self.users.iter().find(|u| &u.user_id == user_id)
    }

    /// Looks up a user for modification.
    pub fn get_mut(&mut self, user_id: &UserId) -> Option<&mut UserEntry> {
        self.users.iter_mut().find(|u| &u.user_id == user_id)
    }

    /// Returns true if the user is known.
    #[must_use]
    pub fn contains(&self, user_id: &UserId) -> bool {
        self.get(user_id).is_some()
    }

    /// Inserts a user, or replaces the existing entry in place.
    pub fn upsert(&mut self, entry: UserEntry) {
        match self.get_mut(&entry.user_id) {
            Some(existing) => *existing = entry,
            None => self.users.push(entry),
        }
    }

    /// Removes a user, clearing the active pointer if it pointed at them.
    pub fn remove(&mut self, user_id: &UserId) -> Option<UserEntry> {
        let index = self.users.iter().position(|u| &u.user_id == user_id)?;
        if self.active_user_id.as_ref() == Some(user_id) {
            self.active_user_id = None;
        }
        Some(self.users.remove(index))
    }

    /// Identifier of the active user.
    #[must_use]
    pub const fn active_user_id(&self) -> Option<&UserId> {
        self.active_user_id.as_ref()
    }

    /// The active user's entry.
    #[must_use]
    pub fn active_entry(&self) -> Option<&UserEntry> {
        self.active_user_id.as_ref().and_then(|id| self.get(id))
    }

    /// The active user's credentials.
    #[must_use]
    pub fn active_credentials(&self) -> Option<&CredentialSet> {
        self.active_entry().and_then(|u| u.credentials.as_ref())
    }

    /// Points the active user at a logged-in entry, or clears it.
    ///
    /// # Errors
    ///
    /// Returns `UnknownUser` if the user is not in the registry and
    /// `UserNotLoggedIn` if they hold no credentials.
    pub fn set_active(&mut self, user_id: Option<UserId>) -> DomainResult<()> {
        if let Some(id) = &user_id {
            let entry = self
                .get(id)
                .ok_or_else(|| DomainError::UnknownUser(id.to_string()))?;
            if !entry.is_logged_in() {
                return Err(DomainError::UserNotLoggedIn(id.to_string()));
            }
        }
        self.active_user_id = user_id;
        Ok(())
    }

    /// Drops the credentials of a user, keeping the entry.
    ///
    /// Clears the active pointer if it pointed at them.
    pub fn clear_credentials(&mut self, user_id: &UserId) -> Option<&UserEntry> {
        if self.active_user_id.as_ref() == Some(user_id) {
            self.active_user_id = None;
        }
        let entry = self.get_mut(user_id)?;
        entry.credentials = None;
        Some(&*entry)
    }

    /// First logged-in anonymous user, if any.
    #[must_use]
    pub fn logged_in_anonymous(&self) -> Option<&UserEntry> {
        self.users
            .iter()
            .find(|u| u.provider == ProviderKind::Anonymous && u.is_logged_in())
    }

    /// Repairs a registry read from storage.
    ///
    /// Keeps the first entry per user id and drops an active pointer that
    /// does not reference a logged-in user.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let mut seen = std::collections::HashSet::new();
        self.users.retain(|u| seen.insert(u.user_id.clone()));
        let active_valid = self
            .active_entry()
            .is_some_and(UserEntry::is_logged_in);
        if !active_valid {
            self.active_user_id = None;
        }
        self
    }

    /// Number of known users.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Returns true if no users are known.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn entry(id: &str, provider: ProviderKind) -> UserEntry {
        UserEntry::logged_in(
            CredentialSet::new(id, format!("dev-{id}"), format!("at-{id}"), None),
            provider,
            Utc::now(),
        )
    }

    #[test]
    fn test_upsert_keeps_order_and_uniqueness() {
        let mut registry = UserRegistry::new();
        registry.upsert(entry("u1", ProviderKind::UserPassword));
        registry.upsert(entry("u2", ProviderKind::UserPassword));
        let mut replacement = entry("u1", ProviderKind::UserPassword);
        replacement.device_id = "new-device".to_string();
        registry.upsert(replacement);

        let ids: Vec<_> = registry.users().iter().map(|u| u.user_id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u2"]);
        assert_eq!(registry.get(&"u1".into()).unwrap().device_id, "new-device");
    }

    #[test]
    fn test_set_active_requires_known_logged_in_user() {
        let mut registry = UserRegistry::new();
        registry.upsert(entry("u1", ProviderKind::UserPassword));

        assert!(matches!(
            registry.set_active(Some("nobody".into())),
            Err(DomainError::UnknownUser(_))
        ));

        registry.set_active(Some("u1".into())).unwrap();
        registry.clear_credentials(&"u1".into());
        assert_eq!(registry.active_user_id(), None);
        assert!(matches!(
            registry.set_active(Some("u1".into())),
            Err(DomainError::UserNotLoggedIn(_))
        ));
    }

    #[test]
    fn test_remove_clears_active_pointer() {
        let mut registry = UserRegistry::new();
        registry.upsert(entry("u1", ProviderKind::Anonymous));
        registry.set_active(Some("u1".into())).unwrap();

        let removed = registry.remove(&"u1".into()).unwrap();
        assert_eq!(removed.user_id.as_str(), "u1");
        assert!(registry.active_user_id().is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_normalized_repairs_bad_documents() {
        let json = serde_json::json!({
            "schema_version": 1,
            "active_user_id": "ghost",
            "users": [
                {"user_id": "u1", "device_id": "d1", "provider": "anonymous",
                 "last_auth_activity": "2024-01-01T00:00:00Z"},
                {"user_id": "u1", "device_id": "d2", "provider": "anonymous",
                 "last_auth_activity": "2024-01-01T00:00:00Z"}
            ]
        });
        let registry: UserRegistry = serde_json::from_value(json).unwrap();
        let registry = registry.normalized();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.users()[0].device_id, "d1");
        assert!(registry.active_user_id().is_none());
    }

    #[test]
    fn test_logged_in_anonymous() {
        let mut registry = UserRegistry::new();
        registry.upsert(entry("named", ProviderKind::UserPassword));
        assert!(registry.logged_in_anonymous().is_none());
        registry.upsert(entry("anon", ProviderKind::Anonymous));
        assert_eq!(
            registry.logged_in_anonymous().unwrap().user_id.as_str(),
            "anon"
        );
    }
}
