use log::debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Commands accepted by the scheduler worker.
///
/// Arming a task kind replaces any deadline already held for that kind, so a
/// superseded timer can never fire.
#[derive(Debug, Clone, Copy)]
pub(super) enum Command {
    /// (Re)start the periodic renewal timer, first firing after `initial_delay`.
    ArmRenewal {
        /// Delay before the first tick; subsequent ticks follow the period.
        initial_delay: Duration,
    },
    /// Schedule the one-shot decommission timer.
    ArmDecommission {
        /// Delay before the decommission fires.
        delay: Duration,
    },
}

/// Callbacks the scheduler worker runs on behalf of the provider.
///
/// The worker executes them serially: a renewal never runs concurrently with
/// a decommission.
pub(super) trait RenewalJob: Send + Sync + 'static {
    fn renew(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
    fn decommission(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Single-worker timer loop driving the renewal and decommission callbacks.
///
/// The worker owns both deadlines as plain state. All queued commands are
/// drained before every timer decision; arming commands are issued either by
/// the worker's own jobs or under the slot's exclusive lock, so a replaced
/// deadline is always overwritten before it has a chance to fire.
pub(super) async fn run_worker<J: RenewalJob>(
    job: Arc<J>,
    period: Duration,
    mut rx: mpsc::UnboundedReceiver<Command>,
    cancel: CancellationToken,
) {
    let worker_id = fastrand::u64(..);
    debug!("Renewal worker started: id={worker_id}");

    let mut renewal_at: Option<Instant> = None;
    let mut decommission_at: Option<Instant> = None;

    loop {
        loop {
            match rx.try_recv() {
                Ok(cmd) => apply(cmd, &mut renewal_at, &mut decommission_at),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    debug!("Scheduler channel closed; stopping worker: id={worker_id}");
                    return;
                }
            }
        }

        if cancel.is_cancelled() {
            debug!("Cancellation signal received; stopping worker: id={worker_id}");
            return;
        }

        let deadline = match (renewal_at, decommission_at) {
            (Some(renewal), Some(decommission)) => Some(renewal.min(decommission)),
            (renewal, decommission) => renewal.or(decommission),
        };

        tokio::select! {
            () = cancel.cancelled() => {
                debug!("Cancellation signal received; stopping worker: id={worker_id}");
                return;
            }
            cmd = rx.recv() => match cmd {
                Some(cmd) => apply(cmd, &mut renewal_at, &mut decommission_at),
                None => {
                    debug!("Scheduler channel closed; stopping worker: id={worker_id}");
                    return;
                }
            },
            () = sleep_until_or_pending(deadline) => {
                let now = Instant::now();
                // When both timers come due in the same tick, decommission
                // runs first: the value is about to cross its safety margin.
                if decommission_at.is_some_and(|at| at <= now) {
                    decommission_at = None;
                    job.decommission().await;
                } else if renewal_at.is_some_and(|at| at <= now) {
                    renewal_at = Some(now + period);
                    job.renew().await;
                }
            }
        }
    }
}

fn apply(cmd: Command, renewal_at: &mut Option<Instant>, decommission_at: &mut Option<Instant>) {
    let now = Instant::now();
    match cmd {
        Command::ArmRenewal { initial_delay } => *renewal_at = Some(now + initial_delay),
        Command::ArmDecommission { delay } => *decommission_at = Some(now + delay),
    }
}

async fn sleep_until_or_pending(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct CountingJob {
        renewals: AtomicU32,
        decommissions: AtomicU32,
    }

    impl RenewalJob for CountingJob {
        fn renew(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
            Box::pin(async {
                self.renewals.fetch_add(1, Ordering::SeqCst);
            })
        }

        fn decommission(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
            Box::pin(async {
                self.decommissions.fetch_add(1, Ordering::SeqCst);
            })
        }
    }

    fn start(
        period: Duration,
    ) -> (
        Arc<CountingJob>,
        mpsc::UnboundedSender<Command>,
        CancellationToken,
        tokio::task::JoinHandle<()>,
    ) {
        let job = Arc::new(CountingJob::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_worker(
            Arc::clone(&job),
            period,
            rx,
            cancel.clone(),
        ));
        (job, tx, cancel, handle)
    }

    #[tokio::test]
    async fn renewal_fires_periodically() {
        let (job, tx, cancel, handle) = start(Duration::from_millis(50));

        tx.send(Command::ArmRenewal {
            initial_delay: Duration::ZERO,
        })
        .expect("worker alive");

        tokio::time::sleep(Duration::from_millis(180)).await;
        cancel.cancel();
        handle.await.expect("worker task panicked");

        let renewals = job.renewals.load(Ordering::SeqCst);
        assert!((3..=5).contains(&renewals), "renewals={renewals}");
        assert_eq!(job.decommissions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn decommission_fires_once() {
        let (job, tx, cancel, handle) = start(Duration::from_secs(60));

        tx.send(Command::ArmDecommission {
            delay: Duration::from_millis(30),
        })
        .expect("worker alive");

        tokio::time::sleep(Duration::from_millis(120)).await;
        cancel.cancel();
        handle.await.expect("worker task panicked");

        assert_eq!(job.decommissions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rearming_replaces_the_pending_deadline() {
        let (job, tx, cancel, handle) = start(Duration::from_secs(60));

        tx.send(Command::ArmDecommission {
            delay: Duration::from_millis(40),
        })
        .expect("worker alive");
        tx.send(Command::ArmDecommission {
            delay: Duration::from_millis(200),
        })
        .expect("worker alive");

        // Past the first deadline but short of the replacement: nothing fires.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(job.decommissions.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(job.decommissions.load(Ordering::SeqCst), 1);

        cancel.cancel();
        handle.await.expect("worker task panicked");
    }

    #[tokio::test]
    async fn worker_stops_when_channel_closes() {
        let (_job, tx, _cancel, handle) = start(Duration::from_secs(60));
        drop(tx);
        handle.await.expect("worker task panicked");
    }
}
