//! Response types

mod service_error;
mod spec;

pub use service_error::{ServiceErrorCode, ServiceErrorPayload};
pub use spec::{Response, StatusCode};
