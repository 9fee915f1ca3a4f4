//! Service clients bound to the auth state machine.

mod core_client;
mod factory;

pub use core_client::{CoreServiceClient, STREAM_REQUEST_PARAM};
pub use factory::{FactoryFn, ServiceClientFactory};
