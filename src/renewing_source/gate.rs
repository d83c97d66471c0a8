use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// One-shot, resettable initialization signal.
///
/// Every renewal attempt fires the gate when it starts (firing an already
/// fired gate is a no-op); readers that arrive before any value exists wait
/// on it. When the slot transitions back to empty after the gate has fired,
/// the gate is swapped for a fresh unfired instance so the next early reader
/// blocks for the next attempt instead of returning straight away.
///
/// Resets must happen under the slot's exclusive lock; the swap itself is
/// atomic, so a concurrent attempt firing the outgoing instance cannot leave
/// the fresh one half-signalled.
pub(super) struct InitGate {
    tx: ArcSwap<watch::Sender<bool>>,
}

impl InitGate {
    pub(super) fn new() -> Self {
        Self {
            tx: ArcSwap::from_pointee(watch::channel(false).0),
        }
    }

    /// Fires the gate, waking all current waiters.
    pub(super) fn signal(&self) {
        self.tx.load().send_replace(true);
    }

    /// Returns `true` once the gate has fired.
    pub(super) fn fired(&self) -> bool {
        *self.tx.load().borrow()
    }

    /// Replaces the gate with a fresh unfired instance.
    pub(super) fn reset(&self) {
        self.tx.store(Arc::new(watch::channel(false).0));
    }

    /// Waits until the gate fires, bounded by `timeout`.
    ///
    /// Returns `true` if the gate fired within the bound.
    pub(super) async fn wait(&self, timeout: Duration) -> bool {
        let mut rx = self.tx.load().subscribe();
        let fired = match tokio::time::timeout(timeout, rx.wait_for(|fired| *fired)).await {
            Ok(result) => result.is_ok(),
            Err(_elapsed) => false,
        };
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_returns_immediately_when_already_fired() {
        let gate = InitGate::new();
        assert!(!gate.fired());

        gate.signal();
        assert!(gate.fired());
        assert!(gate.wait(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn signal_is_idempotent() {
        let gate = InitGate::new();
        gate.signal();
        gate.signal();
        assert!(gate.fired());
    }

    #[tokio::test]
    async fn wait_times_out_on_unfired_gate() {
        let gate = InitGate::new();
        assert!(!gate.wait(Duration::from_millis(20)).await);
    }

    #[tokio::test]
    async fn reset_unfires_the_gate() {
        let gate = InitGate::new();
        gate.signal();
        gate.reset();

        assert!(!gate.fired());
        assert!(!gate.wait(Duration::from_millis(20)).await);
    }

    #[tokio::test]
    async fn waiter_is_woken_by_signal() {
        let gate = Arc::new(InitGate::new());

        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.wait(Duration::from_secs(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        gate.signal();

        assert!(waiter.await.expect("waiter task panicked"));
    }
}
