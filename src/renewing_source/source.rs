use super::builder::RenewalConfig;
use super::errors::{MetricsErrorKind, RenewingSourceError};
use super::gate::InitGate;
use super::metrics::MetricsRecorder;
use super::scheduler::{run_worker, Command};
use super::types::Fetcher;
use crate::clock::Clock;
use crate::resource::ExpiringResource;
use log::{debug, info, warn};
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Auto-renewing cache for a single expiring value.
///
/// `RenewingSource` fetches a value with a known expiration from a pluggable
/// delegate, serves it to many concurrent readers, proactively drops it a
/// configured safety margin before it truly expires, and retries failed
/// fetches on a fixed cadence.
///
/// The defining caller-visible contract is the blocking first read: a caller
/// invoking [`RenewingSource::get`] before the first fetch has completed
/// waits (bounded) for that fetch instead of observing an instant empty
/// result. After that, reads are a non-blocking shared-lock access.
///
/// Fetch failures never surface to readers; the only failure a reader sees
/// is the absence of a value.
///
/// Use [`RenewingSource::shutdown`] or [`RenewingSource::shutdown_configured`]
/// to stop the background worker.
pub struct RenewingSource<T> {
    inner: Arc<Inner<T>>,
}

pub(super) struct Inner<T> {
    // Shared slot holding the current value; empty until the first
    // successful fetch, emptied again by decommission.
    pub(super) slot: RwLock<Option<Arc<ExpiringResource<T>>>>,

    // One-shot, resettable signal for callers arriving before any value.
    pub(super) gate: InitGate,

    // Renewal dependencies.
    pub(super) fetcher: Fetcher<T>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) config: RenewalConfig,
    pub(super) metrics: Option<Arc<dyn MetricsRecorder>>,
    pub(super) wait_timeout: Duration,

    // Scheduler command lane into the renewal worker.
    sched_tx: mpsc::UnboundedSender<Command>,

    // Lifecycle / shutdown.
    closed: AtomicBool,
    cancel: CancellationToken,
    shutdown_timeout: Option<Duration>,

    // Renewal worker handle (joined/aborted at shutdown).
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<T> Debug for RenewingSource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenewingSource")
            .field("slot", &"<RwLock<Option<Arc<ExpiringResource>>>>")
            .field("gate", &"<InitGate>")
            .field("fetcher", &"<Fetcher>")
            .field("clock", &"<Clock>")
            .field("config", &self.inner.config)
            .field(
                "metrics",
                &self.inner.metrics.as_ref().map(|_| "<MetricsRecorder>"),
            )
            .field("wait_timeout", &self.inner.wait_timeout)
            .field("closed", &self.inner.closed.load(Ordering::Relaxed))
            .field("shutdown_timeout", &self.inner.shutdown_timeout)
            .finish()
    }
}

impl<T: Send + Sync + 'static> RenewingSource<T> {
    pub(super) async fn build_with(
        fetcher: Fetcher<T>,
        clock: Arc<dyn Clock>,
        config: RenewalConfig,
        metrics: Option<Arc<dyn MetricsRecorder>>,
        wait_timeout: Duration,
        shutdown_timeout: Option<Duration>,
    ) -> Result<Self, RenewingSourceError> {
        let config = config.normalize();

        let (sched_tx, sched_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let inner = Arc::new(Inner {
            slot: RwLock::new(None),
            gate: InitGate::new(),
            fetcher,
            clock,
            config,
            metrics,
            wait_timeout,
            sched_tx,
            closed: AtomicBool::new(false),
            cancel,
            shutdown_timeout,
            worker: Mutex::new(None),
        });

        info!("Auto renewal initializing");

        let job = Arc::clone(&inner);
        let token = inner.cancel.clone();
        let handle = tokio::spawn(run_worker(job, config.renewal_period, sched_rx, token));
        *inner.worker.lock().await = Some(handle);

        inner.arm_renewal(Duration::ZERO);

        // Bounded wait for the first attempt to at least start. Not fatal:
        // a slow delegate just means early readers block in get() instead.
        debug!("Waiting for the renewal process to start");
        if !inner.gate.wait(inner.wait_timeout).await {
            warn!("Timed out waiting for the first renewal attempt to start");
            inner.record_error(MetricsErrorKind::InitWaitTimeout);
        }

        Ok(Self { inner })
    }

    /// Returns the current value, or `None` if no usable value exists.
    ///
    /// Hot path: a non-blocking shared read of the slot. If the slot is
    /// empty, the call drives an immediate renewal attempt and waits
    /// (bounded by the wait timeout) for it before re-reading. This method
    /// never returns an error and never blocks beyond the configured bounds;
    /// a closed source always yields `None`.
    pub async fn get(&self) -> Option<Arc<ExpiringResource<T>>> {
        if self.is_closed() {
            return None;
        }

        // Fast path: uncontended read of a populated slot.
        if let Ok(guard) = self.inner.slot.try_read() {
            if let Some(resource) = guard.as_ref() {
                return Some(Arc::clone(resource));
            }
        }

        // Slot empty (or briefly contended): try to drive a fetch right now.
        if let Some(resource) = self.inner.request_immediate_renewal().await {
            return Some(resource);
        }

        // Final bounded re-read; whatever is present now is the answer.
        match timeout(self.inner.wait_timeout, self.inner.slot.read()).await {
            Ok(guard) => guard.as_ref().map(Arc::clone),
            Err(_elapsed) => {
                warn!("Timed out reading the resource slot");
                self.inner.record_error(MetricsErrorKind::LockTimeout);
                None
            }
        }
    }

    /// Returns `true` if the source appears healthy and holds a value.
    ///
    /// **Note:** This check is inherently racy; between `is_healthy()` and
    /// `get()` the value may be decommissioned or the source shut down. Use
    /// it for best-effort health reporting, not for synchronization.
    pub fn is_healthy(&self) -> bool {
        if self.is_closed() {
            return false;
        }
        self.inner
            .slot
            .try_read()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Cancels the background worker and waits for it to terminate.
    ///
    /// This method is idempotent. Calling it multiple times is safe and has
    /// no additional effect after the first invocation.
    ///
    /// **Note:** This method may wait for an in-flight fetch to finish. For
    /// production use, prefer [`RenewingSource::shutdown_with_timeout`] or
    /// [`RenewingSource::shutdown_configured`].
    pub async fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.cancel.cancel();

        if let Some(handle) = self.inner.worker.lock().await.take() {
            if let Err(e) = handle.await {
                warn!("Error joining renewal worker during shutdown: error={e}");
                self.inner.record_error(MetricsErrorKind::WorkerJoinFailed);
            }
        }
    }

    /// Cancels the background worker and waits for termination with a timeout.
    ///
    /// Attempts graceful shutdown first: the worker is signalled to stop and
    /// awaited for up to `timeout`. Past the bound the worker is aborted.
    ///
    /// This method is idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`RenewingSourceError::ShutdownTimeout`] if graceful shutdown
    /// does not complete within the timeout and the worker must be aborted.
    pub async fn shutdown_with_timeout(
        &self,
        timeout_after: Duration,
    ) -> Result<(), RenewingSourceError> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.inner.cancel.cancel();

        let Some(mut handle) = self.inner.worker.lock().await.take() else {
            return Ok(());
        };

        match timeout(timeout_after, &mut handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                warn!("Error joining renewal worker during shutdown: error={e}");
                self.inner.record_error(MetricsErrorKind::WorkerJoinFailed);
                Ok(())
            }
            Err(_elapsed) => {
                warn!("Shutdown timeout exceeded; aborting renewal worker");
                handle.abort();
                // Wait for the abort to take effect.
                let _unused: Result<_, _> = (&mut handle).await;
                Err(RenewingSourceError::ShutdownTimeout)
            }
        }
    }

    /// Cancels the background worker using the configured shutdown timeout.
    ///
    /// If no timeout was configured on the builder, waits indefinitely (same
    /// as [`RenewingSource::shutdown`]).
    ///
    /// # Errors
    ///
    /// Returns [`RenewingSourceError::ShutdownTimeout`] if the configured
    /// timeout is exceeded.
    pub async fn shutdown_configured(&self) -> Result<(), RenewingSourceError> {
        if let Some(timeout_after) = self.inner.shutdown_timeout {
            self.shutdown_with_timeout(timeout_after).await
        } else {
            self.shutdown().await;
            Ok(())
        }
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire) || self.inner.cancel.is_cancelled()
    }
}

impl<T> Drop for RenewingSource<T> {
    fn drop(&mut self) {
        // Best-effort cancellation. Do not block in Drop.
        self.inner.cancel.cancel();
    }
}

impl<T: Send + Sync + 'static> Inner<T> {
    /// Slow-path half of `get()`: re-check the slot under the exclusive lock
    /// and, if a completed cycle has left it empty, restart renewal and wait
    /// for the fresh attempt.
    ///
    /// Returns the value when one was present under the lock; `None` means
    /// the caller should re-read the slot.
    async fn request_immediate_renewal(&self) -> Option<Arc<ExpiringResource<T>>> {
        debug!("Attempting to schedule a renewal immediately");

        let current = match timeout(self.wait_timeout, self.slot.write()).await {
            Ok(guard) => {
                let current = guard.as_ref().map(Arc::clone);

                // Double-check under the lock: only reset the gate when a
                // prior cycle has both fired it and left the slot empty
                // (e.g. decommission with a failing delegate). Resetting an
                // unfired gate would strand waiters of the pending first
                // attempt.
                if current.is_none() && self.gate.fired() {
                    self.gate.reset();
                    self.arm_renewal(Duration::ZERO);
                }
                current
            }
            Err(_elapsed) => {
                warn!("Timed out acquiring the resource slot; returning current view");
                self.record_error(MetricsErrorKind::LockTimeout);
                return None;
            }
        };

        if current.is_some() {
            return current;
        }

        if !self.gate.wait(self.wait_timeout).await {
            debug!("Timed out waiting on the renewal attempt");
            self.record_error(MetricsErrorKind::InitWaitTimeout);
        }
        None
    }

    pub(super) fn arm_renewal(&self, initial_delay: Duration) {
        debug!(
            "Scheduling renewal process: initial_delay_ms={}",
            initial_delay.as_millis()
        );
        if self
            .sched_tx
            .send(Command::ArmRenewal { initial_delay })
            .is_err()
        {
            warn!("Renewal worker is gone; renewal not armed");
            self.record_error(MetricsErrorKind::SchedulerStopped);
        }
    }

    pub(super) fn arm_decommission(&self, delay: Duration) {
        debug!(
            "Scheduling resource decommission: delay_ms={}",
            delay.as_millis()
        );
        if self.sched_tx.send(Command::ArmDecommission { delay }).is_err() {
            warn!("Renewal worker is gone; decommission not armed");
            self.record_error(MetricsErrorKind::SchedulerStopped);
        }
    }

    pub(super) fn record_renewal(&self) {
        if let Some(metrics) = self.metrics.as_deref() {
            metrics.record_renewal();
        }
    }

    pub(super) fn record_decommission(&self) {
        if let Some(metrics) = self.metrics.as_deref() {
            metrics.record_decommission();
        }
    }

    pub(super) fn record_error(&self, kind: MetricsErrorKind) {
        if let Some(metrics) = self.metrics.as_deref() {
            metrics.record_error(kind);
        }
    }
}
