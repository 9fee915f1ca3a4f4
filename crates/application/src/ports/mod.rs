//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the session core and external systems.
//! Each port is a trait implemented by adapters in the infrastructure layer.

mod clock;
mod storage;
mod transport;

pub use clock::Clock;
pub use storage::{StorageError, UserStorage};
pub use transport::{EventStream, StreamOpening, Transport, TransportError};
