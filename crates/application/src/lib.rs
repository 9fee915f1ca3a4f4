//! Tether Application - Session layer
//!
//! This crate holds the session logic of the Tether SDK:
//! - Ports (Transport, `UserStorage`, Clock) implemented by adapters
//! - The request client that classifies responses
//! - The auth state machine with refresh-then-retry-once execution
//! - Rebind dispatch to listeners and service clients
//! - The app client composing all of the above

pub mod app_client;
pub mod auth;
pub mod config;
pub mod error;
pub mod ports;
pub mod request_client;
pub mod services;

#[cfg(test)]
mod testing;

pub use app_client::AppClient;
pub use auth::{AuthListener, AuthMachine, AuthRequest, RebindTarget};
pub use config::ClientConfig;
pub use error::{RequestError, SessionError, SessionResult};
pub use request_client::RequestClient;
pub use services::{CoreServiceClient, ServiceClientFactory};
