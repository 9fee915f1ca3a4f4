//! Request types

mod header;
mod method;
mod spec;

pub use header::{ACCEPT, APPLICATION_JSON, AUTHORIZATION, CONTENT_TYPE, Header, Headers};
pub use method::Method;
pub use spec::{BasicRequest, DEFAULT_TIMEOUT_MS, Request};
