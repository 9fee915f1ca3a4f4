//! User storage port
//!
//! Persists the user registry so that an already-logged-in user survives a
//! process restart.

use async_trait::async_trait;
use tether_domain::UserRegistry;

/// Errors that can occur during registry persistence.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Durable store for the user registry.
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Loads the registry. A store that was never written returns an empty
    /// registry.
    async fn load(&self) -> Result<UserRegistry, StorageError>;

    /// Replaces the stored registry.
    ///
    /// # Errors
    /// Returns an error if the registry cannot be written.
    async fn save(&self, registry: &UserRegistry) -> Result<(), StorageError>;
}
