use std::fmt;
use thiserror::Error;

/// Boxed error produced by a fetch delegate.
///
/// Fetch errors never reach callers of
/// [`RenewingSource::get`](super::RenewingSource::get); the renewal routine
/// logs them and retries at the next scheduled tick.
pub type FetchError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by [`RenewingSource`](super::RenewingSource) construction
/// and teardown.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RenewingSourceError {
    /// No fetch delegate was configured on the builder.
    #[error("no fetcher configured")]
    MissingFetcher,

    /// Shutdown timeout exceeded.
    ///
    /// Returned when `shutdown_with_timeout()` is called and the renewal
    /// worker does not terminate within the given bound; the worker is
    /// aborted in that case.
    #[error("shutdown timeout exceeded")]
    ShutdownTimeout,
}

/// Error kinds for structured metrics reporting.
///
/// Use these stable, low-cardinality labels when recording metrics.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum MetricsErrorKind {
    /// The fetch delegate returned an error.
    FetchFailed,
    /// The fetch delegate answered without a value.
    FetchUnavailable,
    /// A fetched value expired (or was about to) and was discarded uninstalled.
    ResourceDiscarded,
    /// A bounded lock acquisition timed out.
    LockTimeout,
    /// Waiting for the first renewal attempt to start timed out.
    InitWaitTimeout,
    /// The scheduler worker was gone when a task had to be (re)armed.
    SchedulerStopped,
    /// Failed to join the renewal worker during shutdown.
    WorkerJoinFailed,
}

impl MetricsErrorKind {
    /// Returns a stable string representation of the error kind.
    ///
    /// This is useful for metrics systems that require string labels.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FetchFailed => "fetch_failed",
            Self::FetchUnavailable => "fetch_unavailable",
            Self::ResourceDiscarded => "resource_discarded",
            Self::LockTimeout => "lock_timeout",
            Self::InitWaitTimeout => "init_wait_timeout",
            Self::SchedulerStopped => "scheduler_stopped",
            Self::WorkerJoinFailed => "worker_join_failed",
        }
    }
}

impl fmt::Display for MetricsErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
