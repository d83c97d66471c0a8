//! Time injection.
//!
//! All renewal arithmetic goes through a [`Clock`] so tests can pin the
//! current instant instead of racing the wall clock.

use time::OffsetDateTime;

/// Supplies the current instant.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current instant.
    fn now(&self) -> OffsetDateTime;
}

/// [`Clock`] backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
