//! Authentication domain types

mod credential;
mod credentials;
mod event;
mod registry;
pub mod token;
mod user;

pub use credential::{Credential, ProviderKind};
pub use credentials::{CredentialSet, UserId, token_preview};
pub use event::{RebindEvent, RebindEventKind};
pub use registry::{REGISTRY_SCHEMA_VERSION, UserRegistry};
pub use user::{AuthUser, UserEntry};
