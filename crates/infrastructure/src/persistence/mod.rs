//! Persistence adapters for the user registry.

mod file_user_storage;
mod memory_user_storage;

pub use file_user_storage::{FileUserStorage, REGISTRY_FILE_NAME};
pub use memory_user_storage::MemoryUserStorage;
