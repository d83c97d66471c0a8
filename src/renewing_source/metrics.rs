use super::errors::MetricsErrorKind;

/// Trait for recording metrics from a [`RenewingSource`](super::RenewingSource).
///
/// Implement this trait to integrate with your metrics system (e.g.,
/// Prometheus, `StatsD`). Prefer stable, low-cardinality labels when
/// recording metrics.
///
/// # Example
///
/// ```no_run
/// use oauth2_token_source::{MetricsErrorKind, MetricsRecorder};
/// use std::sync::Arc;
///
/// struct MyMetrics;
///
/// impl MetricsRecorder for MyMetrics {
///     fn record_renewal(&self) {
///         // Record renewal metric
///     }
///
///     fn record_decommission(&self) {
///         // Record decommission metric
///     }
///
///     fn record_error(&self, kind: MetricsErrorKind) {
///         // Record error metric with kind label
///         println!("Error: {}", kind.as_str());
///     }
/// }
///
/// let metrics = Arc::new(MyMetrics);
/// // Use with RenewingSourceBuilder::metrics()
/// ```
pub trait MetricsRecorder: Send + Sync {
    /// Records that a fresh value was installed into the slot.
    fn record_renewal(&self);

    /// Records that the cached value was dropped at its safety margin.
    fn record_decommission(&self);

    /// Records an error with a structured error kind.
    fn record_error(&self, kind: MetricsErrorKind);
}
