//! Clock port for time-related operations

use chrono::{DateTime, Utc};

/// Port for getting the current time.
///
/// Token expiry checks and auth-activity timestamps read time through
/// this trait so tests can pin it.
pub trait Clock: Send + Sync {
    /// Returns the current UTC timestamp.
    fn now(&self) -> DateTime<Utc>;
}
