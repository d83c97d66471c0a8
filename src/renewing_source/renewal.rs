use super::errors::MetricsErrorKind;
use super::scheduler::RenewalJob;
use super::source::Inner;
use crate::resource::ExpiringResource;
use log::{debug, info, warn};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::time::timeout;

impl<T: Send + Sync + 'static> RenewalJob for Inner<T> {
    fn renew(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(self.renew_once())
    }

    fn decommission(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(self.decommission_now())
    }
}

impl<T: Send + Sync + 'static> Inner<T> {
    /// Runs one renewal attempt.
    ///
    /// While the slot is empty the whole fetch-evaluate-install sequence runs
    /// under the exclusive lock, and the initialization gate fires only once
    /// that lock is held: early readers block for the result instead of
    /// observing "empty" during the first fetch. Once a value is being
    /// served, the delegate is invoked without the lock and the lock is taken
    /// only for the swap.
    pub(super) async fn renew_once(&self) {
        debug!("Resource renewal attempt started");

        let empty = match timeout(self.wait_timeout, self.slot.read()).await {
            Ok(guard) => guard.is_none(),
            Err(_elapsed) => {
                warn!("Timed out inspecting the resource slot; skipping this renewal cycle");
                self.record_error(MetricsErrorKind::LockTimeout);
                return;
            }
        };

        if empty {
            debug!("Pre-emptively locking the slot for the initial fetch");
            match timeout(self.wait_timeout, self.slot.write()).await {
                Ok(mut guard) => {
                    self.gate.signal();
                    if let Some(resource) = self.attempt_fetch().await {
                        self.evaluate_and_install(&mut guard, resource);
                    }
                }
                Err(_elapsed) => {
                    warn!("Timed out locking the slot; skipping this renewal cycle");
                    self.record_error(MetricsErrorKind::LockTimeout);
                }
            }
        } else {
            // Readers keep serving the stale-but-valid value while the
            // delegate round-trips.
            self.gate.signal();
            if let Some(resource) = self.attempt_fetch().await {
                match timeout(self.wait_timeout, self.slot.write()).await {
                    Ok(mut guard) => self.evaluate_and_install(&mut guard, resource),
                    Err(_elapsed) => {
                        warn!("Timed out locking the slot for the swap; dropping fetched value");
                        self.record_error(MetricsErrorKind::LockTimeout);
                    }
                }
            }
        }
    }

    /// Invokes the fetch delegate once, absorbing every failure mode.
    ///
    /// Errors and "unavailable" answers are logged and swallowed; the next
    /// scheduled tick retries. This is the whole retry policy: fixed
    /// interval, no backoff, no attempt cap.
    async fn attempt_fetch(&self) -> Option<ExpiringResource<T>> {
        debug!("Retrieving resource");
        match (self.fetcher)().await {
            Ok(Some(resource)) => Some(resource),
            Ok(None) => {
                info!("Resource not retrieved; delegate had no value");
                self.record_error(MetricsErrorKind::FetchUnavailable);
                None
            }
            Err(e) => {
                warn!("Resource fetch failed; retrying at the next renewal tick: error={e}");
                self.record_error(MetricsErrorKind::FetchFailed);
                None
            }
        }
    }

    /// Evaluates a fetched value against the preemptive-expiry margin and
    /// installs it if it is still worth serving.
    ///
    /// Must be called with the exclusive lock held (`guard`).
    fn evaluate_and_install(
        &self,
        guard: &mut Option<Arc<ExpiringResource<T>>>,
        resource: ExpiringResource<T>,
    ) {
        let time_to_expiry = resource.expires_at() - self.clock.now();
        let time_to_decommission = time_to_expiry - self.config.preemptive_expiry;

        if time_to_decommission > time::Duration::ZERO {
            let delay = std::time::Duration::try_from(time_to_decommission)
                .unwrap_or(std::time::Duration::ZERO);

            info!(
                "Resource updated; decommission in {} ms",
                delay.as_millis()
            );
            *guard = Some(Arc::new(resource));
            self.record_renewal();

            // Arming replaces any pending decommission deadline.
            self.arm_decommission(delay);
        } else {
            info!("Resource already expired or expires too soon to use; ignoring it");
            self.record_error(MetricsErrorKind::ResourceDiscarded);
        }
    }

    /// Clears the slot at the preemptive-expiry deadline and restarts
    /// renewal.
    ///
    /// The periodic timer is re-armed a full period out; the inline attempt
    /// below covers "renew now", so a healthy delegate refills the slot
    /// immediately instead of leaving it empty for up to a period.
    pub(super) async fn decommission_now(&self) {
        info!("Decommissioning resource");

        match timeout(self.wait_timeout, self.slot.write()).await {
            Ok(mut guard) => {
                *guard = None;
            }
            Err(_elapsed) => {
                warn!("Timed out locking the slot; resource left in place until renewal replaces it");
                self.record_error(MetricsErrorKind::LockTimeout);
                return;
            }
        }
        self.record_decommission();

        self.arm_renewal(self.config.renewal_period);
        self.renew_once().await;
    }
}
