//! Cancellation tests: cooperative shutdown must resolve every job,
//! leave pending work untouched, and interrupt backoff waits.

use std::sync::Arc;
use std::time::{Duration, Instant};

use kombajn::core::{Outcome, ToolKind};
use kombajn::orchestration::PoolEvent;
use tokio::sync::mpsc;

use kombajn::adapters::AdapterRegistry;
use kombajn::orchestration::{MetricsCollector, WorkerPool};

use crate::fixtures::{fast_retry, pool_with, username_batch, ScriptedAdapter, Step};

#[tokio::test]
async fn cancel_resolves_in_flight_and_pending_jobs() {
    let script = vec![Step::Hang; 6];
    let adapter = Arc::new(ScriptedAdapter::new(ToolKind::Sherlock, script));
    let pool = pool_with(vec![adapter]);
    let cancel = pool.cancellation_token();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let started = Instant::now();
    let results = pool.run_batch(username_batch(6), 2).await.unwrap();

    // Hung jobs had 500ms timeouts; cancellation returned well before.
    assert!(started.elapsed() < Duration::from_millis(400));

    assert_eq!(results.len(), 6);
    for result in &results {
        assert!(matches!(result.outcome, Outcome::Cancelled));
    }

    // The two in-flight jobs were attempted once, the rest never ran.
    let attempted = results.iter().filter(|r| r.total_attempts > 0).count();
    assert_eq!(attempted, 2);
    let untouched = results.iter().filter(|r| r.total_attempts == 0).count();
    assert_eq!(untouched, 4);
}

#[tokio::test]
async fn cancel_preserves_already_finished_results() {
    // First job succeeds instantly, second hangs, third never starts.
    let script = vec![Step::Ok(Duration::ZERO), Step::Hang];
    let adapter = Arc::new(ScriptedAdapter::new(ToolKind::Sherlock, script));
    let pool = pool_with(vec![adapter]);
    let cancel = pool.cancellation_token();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let results = pool.run_batch(username_batch(3), 1).await.unwrap();
    assert_eq!(results.len(), 3);

    // The completed success is untouched by the cancellation.
    let first = results.get(0).unwrap();
    assert!(first.outcome.is_success());
    assert_eq!(first.total_attempts, 1);
    assert_eq!(results.success_count(), 1);

    let in_flight = results.get(1).unwrap();
    assert!(matches!(in_flight.outcome, Outcome::Cancelled));
    assert_eq!(in_flight.total_attempts, 1);

    let pending = results.get(2).unwrap();
    assert!(matches!(pending.outcome, Outcome::Cancelled));
    assert_eq!(pending.total_attempts, 0);
}

#[tokio::test]
async fn cancel_interrupts_backoff_waits() {
    // Every attempt fails transiently with a long backoff between tries.
    let script = vec![Step::Transient(Duration::ZERO); 10];
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(ScriptedAdapter::new(ToolKind::Sherlock, script)));
    let retry = kombajn::RetryPolicy::new(
        Duration::from_secs(60),
        Duration::from_secs(60),
        true,
    );
    let pool = WorkerPool::new(
        Arc::new(registry),
        retry,
        Arc::new(MetricsCollector::new()),
    );
    let cancel = pool.cancellation_token();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let started = Instant::now();
    let results = pool.run_batch(username_batch(1), 1).await.unwrap();

    // Returned long before the 60s backoff would have elapsed.
    assert!(started.elapsed() < Duration::from_secs(5));

    let result = results.get(0).unwrap();
    assert!(matches!(result.outcome, Outcome::Cancelled));
    assert_eq!(result.total_attempts, 1);
}

#[tokio::test]
async fn cancel_emits_batch_cancelled_event() {
    let script = vec![Step::Hang; 2];
    let adapter = Arc::new(ScriptedAdapter::new(ToolKind::Sherlock, script));
    let (tx, mut rx) = mpsc::channel(64);
    let mut registry = AdapterRegistry::new();
    registry.register(adapter);
    let pool = WorkerPool::new(
        Arc::new(registry),
        fast_retry(),
        Arc::new(MetricsCollector::new()),
    )
    .with_events(tx);
    let cancel = pool.cancellation_token();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    pool.run_batch(username_batch(2), 1).await.unwrap();

    let mut saw_cancelled = false;
    while let Ok(event) = rx.try_recv() {
        if matches!(event, PoolEvent::BatchCancelled) {
            saw_cancelled = true;
        }
    }
    assert!(saw_cancelled);
}

#[tokio::test]
async fn cancel_before_run_resolves_everything_without_dispatch() {
    let adapter = Arc::new(ScriptedAdapter::succeeding(ToolKind::Sherlock));
    let pool = pool_with(vec![adapter]);
    pool.cancellation_token().cancel();

    let results = pool.run_batch(username_batch(3), 2).await.unwrap();

    assert_eq!(results.len(), 3);
    for result in &results {
        assert!(matches!(result.outcome, Outcome::Cancelled));
        assert_eq!(result.total_attempts, 0);
    }
}
