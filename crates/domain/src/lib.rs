//! Tether Domain - Core session types
//!
//! This crate defines the value types of the Tether session SDK:
//! requests and responses, credentials, the user registry and the
//! rebind events. All types here are pure Rust with no I/O dependencies.

pub mod app_info;
pub mod auth;
pub mod error;
pub mod request;
pub mod response;
pub mod routes;
pub mod stream;

pub use app_info::{AppInfo, SDK_VERSION};
pub use auth::{
    AuthUser, Credential, CredentialSet, ProviderKind, RebindEvent, RebindEventKind, UserEntry,
    UserId, UserRegistry,
};
pub use error::{DomainError, DomainResult};
pub use request::{BasicRequest, Headers, Method, Request};
pub use response::{Response, ServiceErrorCode, ServiceErrorPayload, StatusCode};
pub use routes::{AppRoutes, AuthRoutes, ServiceRoutes};
pub use stream::{EventParser, StreamEvent};
