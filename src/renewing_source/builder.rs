use super::errors::{FetchError, RenewingSourceError};
use super::metrics::MetricsRecorder;
use super::source::RenewingSource;
use super::types::Fetcher;
use crate::clock::{Clock, SystemClock};
use crate::resource::ExpiringResource;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Renewal cadence configuration.
///
/// `renewal_period` is how often the background worker re-invokes the fetch
/// delegate while a value is valid (or while every attempt keeps failing).
/// `preemptive_expiry` is the safety margin subtracted from a value's actual
/// expiration to compute its decommission deadline: the cache stops serving
/// a value this long before it truly expires.
#[derive(Clone, Copy, Debug)]
pub struct RenewalConfig {
    /// Steady-state interval between background fetch attempts.
    pub renewal_period: Duration,
    /// Safety margin before true expiry at which the value is retired.
    pub preemptive_expiry: Duration,
}

impl Default for RenewalConfig {
    fn default() -> Self {
        Self {
            // By default, renew every minute and refuse to serve a value in
            // its last minute before expiry.
            renewal_period: Duration::from_secs(60),
            preemptive_expiry: Duration::from_secs(60),
        }
    }
}

impl RenewalConfig {
    /// Normalizes the configuration so the scheduler cannot busy-loop.
    ///
    /// A zero `renewal_period` is raised to one millisecond. Normalization
    /// happens once, at the authoritative boundary during source
    /// construction; the builder setter stores raw values.
    pub(super) fn normalize(mut self) -> Self {
        if self.renewal_period.is_zero() {
            self.renewal_period = Duration::from_millis(1);
        }
        self
    }
}

/// Builder for [`RenewingSource`].
///
/// The fetch delegate is the only required input; the clock, cadence, and
/// timeouts all have production defaults.
///
/// # Example
///
/// ```no_run
/// use oauth2_token_source::{ExpiringResource, RenewalConfig, RenewingSourceBuilder};
/// use std::time::Duration;
/// use time::OffsetDateTime;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let source = RenewingSourceBuilder::new()
///     .fetch_with(|| async {
///         let expires_at = OffsetDateTime::now_utc() + Duration::from_secs(300);
///         Ok(Some(ExpiringResource::new("credential".to_string(), expires_at)))
///     })
///     .config(RenewalConfig {
///         renewal_period: Duration::from_secs(30),
///         preemptive_expiry: Duration::from_secs(60),
///     })
///     .build()
///     .await?;
///
/// let value = source.get().await;
/// # Ok(())
/// # }
/// ```
pub struct RenewingSourceBuilder<T> {
    fetcher: Option<Fetcher<T>>,
    clock: Arc<dyn Clock>,
    config: RenewalConfig,
    metrics: Option<Arc<dyn MetricsRecorder>>,
    wait_timeout: Duration,
    shutdown_timeout: Option<Duration>,
}

impl<T> Debug for RenewingSourceBuilder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenewingSourceBuilder")
            .field("fetcher", &self.fetcher.as_ref().map(|_| "<Fetcher>"))
            .field("clock", &"<Clock>")
            .field("config", &self.config)
            .field(
                "metrics",
                &self.metrics.as_ref().map(|_| "<MetricsRecorder>"),
            )
            .field("wait_timeout", &self.wait_timeout)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}

impl<T> Default for RenewingSourceBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RenewingSourceBuilder<T> {
    /// Creates a new `RenewingSourceBuilder`.
    pub fn new() -> Self {
        Self {
            fetcher: None,
            clock: Arc::new(SystemClock),
            config: RenewalConfig::default(),
            metrics: None,
            wait_timeout: Duration::from_secs(10),
            shutdown_timeout: Some(Duration::from_secs(30)),
        }
    }

    /// Sets the fetch delegate.
    #[must_use]
    pub fn fetcher(mut self, fetcher: Fetcher<T>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Sets the fetch delegate from an async closure.
    ///
    /// Convenience over [`RenewingSourceBuilder::fetcher`] that boxes the
    /// returned future.
    #[must_use]
    pub fn fetch_with<F, Fut>(mut self, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<ExpiringResource<T>>, FetchError>> + Send + 'static,
    {
        let fetcher: Fetcher<T> = Arc::new(move || Box::pin(fetch()));
        self.fetcher = Some(fetcher);
        self
    }

    /// Sets the clock used for expiry arithmetic.
    ///
    /// Defaults to [`SystemClock`].
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the renewal cadence.
    #[must_use]
    pub const fn config(mut self, config: RenewalConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets an optional metrics recorder for observability.
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Sets the bound applied to lock acquisitions and first-fetch waits.
    ///
    /// Every blocking step inside the source (slot lock acquisition, waiting
    /// for the first renewal attempt) is bounded by this timeout, so no
    /// caller can wait forever on a stuck renewal. Default is 10 seconds.
    #[must_use]
    pub const fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Sets the shutdown timeout used by `shutdown_configured()`.
    ///
    /// If `None`, configured shutdown waits indefinitely. Default is
    /// 30 seconds.
    #[must_use]
    pub const fn shutdown_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl<T: Send + Sync + 'static> RenewingSourceBuilder<T> {
    /// Builds a ready-to-use [`RenewingSource`].
    ///
    /// Construction arms the renewal task immediately and waits (bounded by
    /// the wait timeout) for the first fetch attempt to start; the returned
    /// source keeps renewing in the background until it is shut down or
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`RenewingSourceError::MissingFetcher`] if no fetch delegate
    /// was configured. A failing delegate is not a construction error; the
    /// source starts empty and keeps retrying on its renewal period.
    pub async fn build(self) -> Result<RenewingSource<T>, RenewingSourceError> {
        let fetcher = self.fetcher.ok_or(RenewingSourceError::MissingFetcher)?;

        RenewingSource::build_with(
            fetcher,
            self.clock,
            self.config,
            self.metrics,
            self.wait_timeout,
            self.shutdown_timeout,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renewal_config_defaults_to_one_minute_each() {
        let config = RenewalConfig::default();
        assert_eq!(config.renewal_period, Duration::from_secs(60));
        assert_eq!(config.preemptive_expiry, Duration::from_secs(60));
    }

    #[test]
    fn normalize_raises_zero_period() {
        let config = RenewalConfig {
            renewal_period: Duration::ZERO,
            preemptive_expiry: Duration::from_secs(1),
        }
        .normalize();
        assert_eq!(config.renewal_period, Duration::from_millis(1));

        // Valid configurations pass through untouched.
        let config = RenewalConfig::default().normalize();
        assert_eq!(config.renewal_period, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn build_without_fetcher_fails() {
        let result = RenewingSourceBuilder::<String>::new().build().await;
        assert!(matches!(result, Err(RenewingSourceError::MissingFetcher)));
    }
}
