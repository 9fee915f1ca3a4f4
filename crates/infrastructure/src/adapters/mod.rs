//! Adapters for the transport and clock ports.

mod reqwest_transport;
mod system_clock;

pub use reqwest_transport::ReqwestTransport;
pub use system_clock::SystemClock;
