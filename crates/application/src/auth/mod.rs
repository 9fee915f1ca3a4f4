//! Authentication for the Tether session layer.
//!
//! This module provides:
//! - The auth state machine (login, logout, switching, refresh)
//! - Authenticated request execution with refresh-then-retry-once
//! - Listener registration and rebind dispatch to service clients

mod listener;
mod machine;
mod request;

pub use listener::{AuthListener, RebindDispatcher, RebindTarget};
pub use machine::{AuthDeps, AuthMachine, STREAM_TOKEN_PARAM};
pub use request::AuthRequest;
