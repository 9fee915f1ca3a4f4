//! File-based user storage.
//!
//! The registry is one JSON document:
//! ```json
//! {
//!   "schema_version": 1,
//!   "active_user_id": "5f1f...",
//!   "users": [
//!     {
//!       "user_id": "5f1f...",
//!       "device_id": "5f20...",
//!       "provider": "user_password",
//!       "credentials": { "user_id": "5f1f...", "device_id": "5f20...", "access_token": "...", "refresh_token": "..." },
//!       "last_auth_activity": "2026-01-01T12:00:00Z"
//!     }
//!   ]
//! }
//! ```
//! Writes go to a sibling temporary file that is then renamed over the
//! target, so a crash never leaves a half-written registry.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tether_application::ports::{StorageError, UserStorage};
use tether_domain::UserRegistry;
use tether_domain::auth::REGISTRY_SCHEMA_VERSION;
use tokio::fs;
use tracing::debug;

use crate::serialization::{from_json_bytes, to_json_stable_bytes};

/// File name used inside a storage directory.
pub const REGISTRY_FILE_NAME: &str = "users.json";

/// User storage backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileUserStorage {
    path: PathBuf,
}

impl FileUserStorage {
    /// Creates a storage writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a storage writing `users.json` inside `dir`.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(REGISTRY_FILE_NAME))
    }

    /// Returns the registry file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl UserStorage for FileUserStorage {
    async fn load(&self) -> Result<UserRegistry, StorageError> {
        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no stored registry");
                return Ok(UserRegistry::new());
            }
            Err(e) => return Err(StorageError::Io(e)),
        };

        let registry: UserRegistry =
            from_json_bytes(&content).map_err(|e| StorageError::Serialization(e.to_string()))?;
        if registry.schema_version > REGISTRY_SCHEMA_VERSION {
            return Err(StorageError::Serialization(format!(
                "unsupported registry schema version {} (max {REGISTRY_SCHEMA_VERSION})",
                registry.schema_version
            )));
        }
        Ok(registry)
    }

    async fn save(&self, registry: &UserRegistry) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let content = to_json_stable_bytes(registry)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let temp = self.temp_path();
        fs::write(&temp, &content).await?;
        if let Err(error) = fs::rename(&temp, &self.path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(StorageError::Io(error));
        }
        debug!(path = %self.path.display(), users = registry.len(), "saved registry");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use tether_domain::{CredentialSet, ProviderKind, UserEntry, UserId};

    fn registry() -> UserRegistry {
        let mut registry = UserRegistry::new();
        registry.upsert(UserEntry::logged_in(
            CredentialSet::new("u1", "d1", "t1", Some("r1".to_string())),
            ProviderKind::UserPassword,
            Utc::now(),
        ));
        registry.set_active(Some(UserId::new("u1"))).unwrap();
        registry
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let storage = FileUserStorage::in_dir(dir.path());

        let loaded = storage.load().await.unwrap();

        assert!(loaded.is_empty());
        assert!(loaded.active_user_id().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_restores_active_user() {
        let dir = TempDir::new().unwrap();
        let storage = FileUserStorage::new(dir.path().join("nested").join("users.json"));
        let original = registry();

        storage.save(&original).await.unwrap();
        let loaded = storage.load().await.unwrap();

        assert_eq!(loaded, original);
        assert!(!storage.temp_path().exists());
    }

    #[tokio::test]
    async fn test_failed_rename_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let storage = FileUserStorage::in_dir(dir.path());
        std::fs::create_dir(storage.path()).unwrap();
        std::fs::write(storage.path().join("occupied"), b"x").unwrap();

        let error = storage.save(&registry()).await.unwrap_err();

        assert!(matches!(error, StorageError::Io(_)));
        assert!(!storage.temp_path().exists());
    }

    #[tokio::test]
    async fn test_file_is_stable_json() {
        let dir = TempDir::new().unwrap();
        let storage = FileUserStorage::in_dir(dir.path());
        storage.save(&registry()).await.unwrap();
        let first = std::fs::read_to_string(storage.path()).unwrap();

        storage.save(&storage.load().await.unwrap()).await.unwrap();
        let second = std::fs::read_to_string(storage.path()).unwrap();

        assert_eq!(first, second);
        assert!(first.starts_with("{\n  \"schema_version\": 1,"));
        assert!(first.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_serialization_error() {
        let dir = TempDir::new().unwrap();
        let storage = FileUserStorage::in_dir(dir.path());
        std::fs::write(storage.path(), b"{not json").unwrap();

        let error = storage.load().await.unwrap_err();

        assert!(matches!(error, StorageError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_newer_schema_is_rejected() {
        let dir = TempDir::new().unwrap();
        let storage = FileUserStorage::in_dir(dir.path());
        std::fs::write(storage.path(), br#"{"schema_version": 99, "users": []}"#).unwrap();

        let error = storage.load().await.unwrap_err();

        assert!(matches!(error, StorageError::Serialization(m) if m.contains("99")));
    }
}
