//! In-memory user storage.

use async_trait::async_trait;
use parking_lot::RwLock;
use tether_application::ports::{StorageError, UserStorage};
use tether_domain::UserRegistry;

/// User storage that lives only as long as the process.
///
/// Useful for ephemeral sessions and tests.
#[derive(Debug, Default)]
pub struct MemoryUserStorage {
    registry: RwLock<UserRegistry>,
}

impl MemoryUserStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the stored registry.
    #[must_use]
    pub fn snapshot(&self) -> UserRegistry {
        self.registry.read().clone()
    }
}

#[async_trait]
impl UserStorage for MemoryUserStorage {
    async fn load(&self) -> Result<UserRegistry, StorageError> {
        Ok(self.snapshot())
    }

    async fn save(&self, registry: &UserRegistry) -> Result<(), StorageError> {
        *self.registry.write() = registry.clone();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tether_domain::{CredentialSet, ProviderKind, UserEntry};

    #[tokio::test]
    async fn test_save_replaces_registry() {
        let storage = MemoryUserStorage::new();
        let mut registry = UserRegistry::new();
        registry.upsert(UserEntry::logged_in(
            CredentialSet::new("u1", "d1", "t1", None),
            ProviderKind::Anonymous,
            Utc::now(),
        ));

        storage.save(&registry).await.unwrap();

        assert_eq!(storage.load().await.unwrap(), registry);
    }
}
