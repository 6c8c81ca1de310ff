//! Batch execution tests: ordering, concurrency bounds, retry behavior,
//! and metrics accounting across full pool runs.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use kombajn::adapters::AdapterRegistry;
use kombajn::core::{ErrorKind, Job, Outcome, Target, ToolKind};
use kombajn::orchestration::{MetricsCollector, PoolEvent, WorkerPool};
use kombajn::{Config, OsintEngine};

use crate::fixtures::{fast_retry, pool_with, username_batch, ScriptedAdapter, Step};

#[tokio::test]
async fn results_come_back_in_submission_order() {
    // Later jobs finish first: delays decrease with the index.
    let script: Vec<Step> = (0..4)
        .map(|i| Step::Ok(Duration::from_millis(80 - i * 20)))
        .collect();
    let adapter = Arc::new(ScriptedAdapter::new(ToolKind::Sherlock, script));
    let pool = pool_with(vec![adapter]);

    let jobs = username_batch(4);
    let ids: Vec<_> = jobs.iter().map(|j| j.id).collect();

    let results = pool.run_batch(jobs, 4).await.unwrap();
    let returned: Vec<_> = results.iter().map(|r| r.job_id).collect();
    assert_eq!(returned, ids);
}

#[tokio::test]
async fn concurrency_limit_is_never_exceeded() {
    let script = vec![Step::Ok(Duration::from_millis(30)); 8];
    let adapter = Arc::new(ScriptedAdapter::new(ToolKind::Sherlock, script));
    let max_active = adapter.max_active_handle();
    let pool = pool_with(vec![adapter]);

    pool.run_batch(username_batch(8), 3).await.unwrap();

    assert!(max_active.load(std::sync::atomic::Ordering::SeqCst) <= 3);
}

#[tokio::test]
async fn result_slots_follow_job_index_not_vec_position() {
    let adapter = Arc::new(ScriptedAdapter::succeeding(ToolKind::Sherlock));
    let pool = pool_with(vec![adapter]);

    // Hand the batch over reversed: vec position disagrees with index.
    let mut jobs = username_batch(3);
    jobs.reverse();

    let results = pool.run_batch(jobs, 3).await.unwrap();

    for i in 0..3 {
        let result = results.get(i).unwrap();
        assert_eq!(result.target, Target::Username(format!("user{i}")));
    }
}

#[tokio::test]
async fn concurrency_one_fully_serializes() {
    let script = vec![Step::Ok(Duration::from_millis(20)); 4];
    let adapter = Arc::new(ScriptedAdapter::new(ToolKind::Sherlock, script));
    let max_active = adapter.max_active_handle();
    let pool = pool_with(vec![adapter]);

    pool.run_batch(username_batch(4), 1).await.unwrap();

    assert_eq!(max_active.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn wide_limit_actually_runs_jobs_in_parallel() {
    let script = vec![Step::Ok(Duration::from_millis(50)); 4];
    let adapter = Arc::new(ScriptedAdapter::new(ToolKind::Sherlock, script));
    let max_active = adapter.max_active_handle();
    let pool = pool_with(vec![adapter]);

    let started = std::time::Instant::now();
    pool.run_batch(username_batch(4), 4).await.unwrap();

    // Serial execution would take at least 200ms.
    assert!(started.elapsed() < Duration::from_millis(180));
    assert!(max_active.load(std::sync::atomic::Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn transient_failures_consume_the_retry_budget() {
    let script = vec![
        Step::Transient(Duration::ZERO),
        Step::Transient(Duration::ZERO),
        Step::Ok(Duration::ZERO),
    ];
    let adapter = Arc::new(ScriptedAdapter::new(ToolKind::Sherlock, script));
    let pool = pool_with(vec![adapter]);

    let mut jobs = username_batch(1);
    jobs[0] = jobs[0].clone().with_max_retries(3);
    let results = pool.run_batch(jobs, 1).await.unwrap();

    let result = results.get(0).unwrap();
    assert!(result.outcome.is_success());
    assert_eq!(result.total_attempts, 3);
}

#[tokio::test]
async fn permanent_failures_are_not_retried() {
    let script = vec![Step::Permanent(Duration::ZERO), Step::Ok(Duration::ZERO)];
    let adapter = Arc::new(ScriptedAdapter::new(ToolKind::Sherlock, script));
    let pool = pool_with(vec![adapter]);

    let results = pool.run_batch(username_batch(1), 1).await.unwrap();

    let result = results.get(0).unwrap();
    assert_eq!(result.total_attempts, 1);
    assert!(matches!(
        result.outcome,
        Outcome::Failure {
            kind: ErrorKind::Permanent,
            ..
        }
    ));
}

#[tokio::test]
async fn hung_tool_times_out_and_is_retried() {
    let script = vec![Step::Hang, Step::Ok(Duration::ZERO)];
    let adapter = Arc::new(ScriptedAdapter::new(ToolKind::Sherlock, script));
    let pool = pool_with(vec![adapter]);

    // 500ms job timeout from the fixture; the hang never returns.
    let results = pool.run_batch(username_batch(1), 1).await.unwrap();

    let result = results.get(0).unwrap();
    assert!(result.outcome.is_success());
    assert_eq!(result.total_attempts, 2);
}

#[tokio::test]
async fn timeout_exhaustion_ends_in_timed_out() {
    // Every attempt hangs; the job times out its entire retry budget.
    let script = vec![Step::Hang; 3];
    let adapter = Arc::new(ScriptedAdapter::new(ToolKind::Sherlock, script));
    let pool = pool_with(vec![adapter]);

    let job = Job::new(0, ToolKind::Sherlock, Target::Username("alice".into()))
        .with_timeout(Duration::from_millis(100))
        .with_max_retries(2);
    let results = pool.run_batch(vec![job], 1).await.unwrap();

    let result = results.get(0).unwrap();
    assert_eq!(result.total_attempts, 3);
    assert!(matches!(result.outcome, Outcome::TimedOut { .. }));
}

#[tokio::test]
async fn every_job_gets_exactly_one_result() {
    let script = vec![
        Step::Ok(Duration::ZERO),
        Step::Permanent(Duration::ZERO),
        Step::Hang,
        Step::Ok(Duration::ZERO),
        Step::Ok(Duration::ZERO),
    ];
    let adapter = Arc::new(ScriptedAdapter::new(ToolKind::Sherlock, script));
    let pool = pool_with(vec![adapter]);

    let mut jobs = username_batch(4);
    // The hung job must not eat the budget forever.
    jobs[2] = jobs[2].clone().with_max_retries(1);
    let results = pool.run_batch(jobs, 1).await.unwrap();

    assert_eq!(results.len(), 4);
    assert_eq!(results.success_count(), 3);
}

#[tokio::test]
async fn priority_controls_dispatch_order() {
    let adapter = Arc::new(ScriptedAdapter::succeeding(ToolKind::Sherlock));
    let (tx, mut rx) = mpsc::channel(64);
    let mut registry = AdapterRegistry::new();
    registry.register(adapter);
    let pool = WorkerPool::new(
        Arc::new(registry),
        fast_retry(),
        Arc::new(MetricsCollector::new()),
    )
    .with_events(tx);

    let jobs: Vec<Job> = username_batch(3)
        .into_iter()
        .zip([0, 10, 5])
        .map(|(job, priority)| job.with_priority(priority))
        .collect();

    pool.run_batch(jobs, 1).await.unwrap();

    let mut started = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let PoolEvent::JobStarted { index, .. } = event {
            started.push(index);
        }
    }
    // Highest priority first, ties by submission order.
    assert_eq!(started, vec![1, 2, 0]);
}

#[tokio::test]
async fn metrics_account_for_all_attempts() {
    let script = vec![
        Step::Transient(Duration::ZERO),
        Step::Ok(Duration::ZERO),
        Step::Ok(Duration::ZERO),
    ];
    let metrics = Arc::new(MetricsCollector::new());
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(ScriptedAdapter::new(ToolKind::Sherlock, script)));
    let pool = WorkerPool::new(Arc::new(registry), fast_retry(), Arc::clone(&metrics));

    pool.run_batch(username_batch(2), 2).await.unwrap();

    let snapshot = metrics.snapshot();
    let stats = snapshot.tool(ToolKind::Sherlock).unwrap();
    assert_eq!(stats.attempts, 3);
    assert_eq!(stats.successes, 2);
    assert_eq!(stats.failures, 1);
    assert_eq!(stats.retries, 1);
    assert_eq!(stats.errors_by_kind.get("transient"), Some(&1));
}

#[tokio::test]
async fn engine_runs_a_mixed_target_batch_end_to_end() {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(ScriptedAdapter::succeeding(ToolKind::Sherlock)));
    registry.register(Arc::new(ScriptedAdapter::succeeding(ToolKind::Maigret)));
    registry.register(Arc::new(ScriptedAdapter::succeeding(ToolKind::Holehe)));
    let engine = OsintEngine::with_registry(Config::default(), registry);

    let targets = vec![
        Target::Username("alice".into()),
        Target::Email("alice@example.com".into()),
    ];
    let jobs = engine.plan(&targets).unwrap();
    assert_eq!(jobs.len(), 3); // username fans out to two tools

    let (results, metrics) = engine.run(jobs).await.unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.any_success());
    assert_eq!(results.success_count(), 3);
    assert_eq!(metrics.total_attempts(), 3);
}
