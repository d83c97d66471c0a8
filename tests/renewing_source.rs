//! End-to-end behavior of the auto-renewing source against scripted
//! delegates: blocking first read, steady-state refresh, preemptive expiry,
//! failure recovery, and concurrent reads.

use oauth2_token_source::{
    ExpiringResource, FetchError, Fetcher, RenewalConfig, RenewingSourceBuilder, RenewingSource,
    RenewingSourceError,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use time::OffsetDateTime;

const HOUR: Duration = Duration::from_secs(3600);

#[derive(Clone)]
enum Step {
    Value {
        name: &'static str,
        ttl: Duration,
        delay: Duration,
    },
    Unavailable,
    Fail,
}

fn value(name: &'static str, ttl: Duration) -> Step {
    Step::Value {
        name,
        ttl,
        delay: Duration::ZERO,
    }
}

fn slow_value(name: &'static str, ttl: Duration, delay: Duration) -> Step {
    Step::Value { name, ttl, delay }
}

/// Delegate that plays `steps` in order, repeating the last step forever.
fn scripted(steps: Vec<Step>) -> Fetcher<String> {
    let queue = Arc::new(Mutex::new(VecDeque::from(steps)));
    let fetcher: Fetcher<String> = Arc::new(move || {
        let queue = Arc::clone(&queue);
        Box::pin(async move {
            let step = {
                let mut queue = queue.lock().expect("script lock");
                if queue.len() > 1 {
                    queue.pop_front().expect("non-empty script")
                } else {
                    queue.front().cloned().expect("non-empty script")
                }
            };

            match step {
                Step::Value { name, ttl, delay } => {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    Ok(Some(ExpiringResource::new(
                        name.to_string(),
                        OffsetDateTime::now_utc() + ttl,
                    )))
                }
                Step::Unavailable => Ok(None),
                Step::Fail => Err(FetchError::from("synthetic fetch failure")),
            }
        })
    });
    fetcher
}

async fn build(
    fetcher: Fetcher<String>,
    renewal_period: Duration,
    preemptive_expiry: Duration,
) -> RenewingSource<String> {
    RenewingSourceBuilder::new()
        .fetcher(fetcher)
        .config(RenewalConfig {
            renewal_period,
            preemptive_expiry,
        })
        .build()
        .await
        .expect("source builds")
}

// A caller arriving before the delegate has produced anything blocks until
// the first result is available, then observes exactly that result.
#[tokio::test]
async fn get_blocks_until_the_first_fetch_completes() {
    let fetcher = scripted(vec![slow_value("first", HOUR, Duration::from_millis(200))]);
    let source = build(fetcher, Duration::from_secs(60), Duration::from_secs(60)).await;

    let started = Instant::now();
    let resource = source.get().await.expect("first value");

    assert_eq!(resource.value(), "first");
    assert!(
        started.elapsed() >= Duration::from_millis(100),
        "get() should have waited out the in-flight fetch"
    );
}

// A throwing first attempt is swallowed; the next periodic attempt recovers
// and readers see its value.
#[tokio::test]
async fn failed_first_fetch_recovers_on_the_next_tick() {
    let fetcher = scripted(vec![Step::Fail, value("recovered", HOUR)]);
    let source = build(fetcher, Duration::from_millis(200), Duration::from_secs(60)).await;

    tokio::time::sleep(Duration::from_millis(320)).await;

    let resource = source.get().await.expect("recovered value");
    assert_eq!(resource.value(), "recovered");
}

// Steady-state: the slot is refreshed every renewal period while the old
// value keeps being served.
#[tokio::test]
async fn steady_state_refresh_swaps_in_the_new_value() {
    let fetcher = scripted(vec![value("a", HOUR), value("b", HOUR)]);
    let source = build(fetcher, Duration::from_millis(200), Duration::from_secs(60)).await;

    let first = source.get().await.expect("initial value");
    assert_eq!(first.value(), "a");

    tokio::time::sleep(Duration::from_millis(320)).await;

    let second = source.get().await.expect("refreshed value");
    assert_eq!(second.value(), "b");
}

// A value expiring in 1000ms with a 300ms margin is served for ~700ms; once
// decommissioned with the delegate dry, readers get "no value".
#[tokio::test]
async fn preemptive_expiry_empties_the_slot() {
    let fetcher = scripted(vec![value("short", Duration::from_millis(1000)), Step::Unavailable]);
    let source = build(fetcher, Duration::from_secs(60), Duration::from_millis(300)).await;

    tokio::time::sleep(Duration::from_millis(400)).await;
    let resource = source.get().await.expect("still inside the serving window");
    assert_eq!(resource.value(), "short");

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(
        source.get().await.is_none(),
        "value must be retired at expires_at - preemptive_expiry"
    );
    assert!(!source.is_healthy());
}

// After the slot empties, the first read once the delegate heals drives an
// immediate fetch and blocks for it.
#[tokio::test]
async fn reader_triggers_refetch_once_the_delegate_heals() {
    let fetcher = scripted(vec![
        value("short", Duration::from_millis(600)),
        Step::Unavailable,
        value("healed", HOUR),
    ]);
    let source = build(fetcher, Duration::from_secs(60), Duration::from_millis(300)).await;

    // Past the decommission deadline; the inline retry hit `Unavailable`.
    tokio::time::sleep(Duration::from_millis(450)).await;

    let resource = source.get().await.expect("value after self-healing");
    assert_eq!(resource.value(), "healed");
}

// Concurrent readers racing a renewal swap observe either the old or the new
// value, never anything else, and never an empty result.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_readers_see_only_whole_values() {
    let fetcher = scripted(vec![value("a", HOUR), value("b", HOUR), value("c", HOUR)]);
    let source = Arc::new(build(fetcher, Duration::from_millis(50), Duration::from_secs(60)).await);

    // Warm up so no reader races the very first fetch.
    source.get().await.expect("warm value");

    let mut readers = Vec::new();
    for _ in 0..8 {
        let source = Arc::clone(&source);
        readers.push(tokio::spawn(async move {
            let deadline = Instant::now() + Duration::from_millis(300);
            let mut seen = Vec::new();
            while Instant::now() < deadline {
                let resource = source.get().await.expect("value during steady state");
                seen.push(resource.value().clone());
                tokio::task::yield_now().await;
            }
            seen
        }));
    }

    for reader in readers {
        for observed in reader.await.expect("reader task") {
            assert!(
                ["a", "b", "c"].contains(&observed.as_str()),
                "torn or unknown value observed: {observed}"
            );
        }
    }
}

// A fetched value already inside its safety margin is discarded without
// touching the previously installed value.
#[tokio::test]
async fn too_stale_fetch_leaves_prior_value_untouched() {
    let fetcher = scripted(vec![
        value("good", HOUR),
        value("stale", Duration::from_millis(100)),
    ]);
    let source = build(fetcher, Duration::from_millis(200), Duration::from_millis(300)).await;

    let first = source.get().await.expect("initial value");
    assert_eq!(first.value(), "good");

    // The next tick fetches the too-stale value and must ignore it.
    tokio::time::sleep(Duration::from_millis(350)).await;

    let second = source.get().await.expect("prior value still served");
    assert_eq!(second.value(), "good");
    assert!(source.is_healthy());
}

// Every wait inside get() is bounded: a wedged delegate yields "no value"
// within the configured bounds instead of hanging the caller.
#[tokio::test]
async fn get_latency_is_bounded_while_a_fetch_is_stuck() {
    let fetcher = scripted(vec![slow_value("slow", HOUR, Duration::from_secs(2))]);
    let source = RenewingSourceBuilder::new()
        .fetcher(fetcher)
        .wait_timeout(Duration::from_millis(100))
        .build()
        .await
        .expect("source builds");

    let started = Instant::now();
    assert!(source.get().await.is_none());
    assert!(
        started.elapsed() < Duration::from_secs(1),
        "get() must give up within its bounds"
    );

    // Once the fetch lands the value is served normally.
    tokio::time::sleep(Duration::from_millis(2200)).await;
    let resource = source.get().await.expect("late value");
    assert_eq!(resource.value(), "slow");
}

#[tokio::test]
async fn shutdown_stops_renewals_and_readers() {
    let fetcher = scripted(vec![value("a", HOUR)]);
    let source = build(fetcher, Duration::from_millis(100), Duration::from_secs(60)).await;

    source.get().await.expect("warm value");
    source.shutdown().await;

    assert!(source.get().await.is_none());
    assert!(!source.is_healthy());
}

#[tokio::test]
async fn shutdown_times_out_on_a_wedged_worker() {
    let fetcher = scripted(vec![slow_value("slow", HOUR, Duration::from_secs(5))]);
    let source = RenewingSourceBuilder::new()
        .fetcher(fetcher)
        .wait_timeout(Duration::from_millis(100))
        .build()
        .await
        .expect("source builds");

    // The worker is inside the 5s fetch; graceful shutdown cannot finish.
    let result = source.shutdown_with_timeout(Duration::from_millis(100)).await;
    assert!(matches!(result, Err(RenewingSourceError::ShutdownTimeout)));
}
