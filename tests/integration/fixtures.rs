//! Test fixtures for integration tests.
//!
//! Provides scripted adapters with controlled delays and failure
//! sequences, plus helpers for building engines and job batches.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use kombajn::adapters::{AdapterError, AdapterRegistry, ToolAdapter};
use kombajn::core::{Job, Target, ToolKind};
use kombajn::orchestration::{MetricsCollector, RetryPolicy, WorkerPool};

/// One step of a scripted adapter run.
#[derive(Debug, Clone)]
pub enum Step {
    /// Succeed after the given delay.
    Ok(Duration),
    /// Fail transiently after the given delay.
    Transient(Duration),
    /// Fail permanently after the given delay.
    Permanent(Duration),
    /// Sleep far past any job timeout (simulates a hung tool).
    Hang,
}

/// Adapter that replays a fixed sequence of steps, one per invocation.
/// Once the script is exhausted it keeps succeeding instantly.
pub struct ScriptedAdapter {
    kind: ToolKind,
    script: Vec<Step>,
    calls: AtomicUsize,
    active: Arc<AtomicU32>,
    max_active: Arc<AtomicU32>,
}

impl ScriptedAdapter {
    pub fn new(kind: ToolKind, script: Vec<Step>) -> Self {
        Self {
            kind,
            script,
            calls: AtomicUsize::new(0),
            active: Arc::new(AtomicU32::new(0)),
            max_active: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn succeeding(kind: ToolKind) -> Self {
        Self::new(kind, vec![])
    }

    /// High-water mark of concurrent invocations.
    pub fn max_active_handle(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.max_active)
    }
}

#[async_trait]
impl ToolAdapter for ScriptedAdapter {
    fn kind(&self) -> ToolKind {
        self.kind
    }

    fn accepts(&self, _target: &Target) -> bool {
        true
    }

    async fn invoke(&self, target: &Target) -> Result<serde_json::Value, AdapterError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        let step = self.script.get(call).cloned().unwrap_or(Step::Ok(Duration::ZERO));
        let result = match step {
            Step::Ok(delay) => {
                tokio::time::sleep(delay).await;
                Ok(json!({ "target": target.value(), "call": call }))
            }
            Step::Transient(delay) => {
                tokio::time::sleep(delay).await;
                Err(AdapterError::transient("scripted transient failure"))
            }
            Step::Permanent(delay) => {
                tokio::time::sleep(delay).await;
                Err(AdapterError::permanent("scripted permanent failure"))
            }
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(json!({}))
            }
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Retry policy with millisecond backoff so tests stay fast.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(Duration::from_millis(1), Duration::from_millis(10), true)
}

/// Pool over a single scripted adapter.
pub fn pool_with(adapters: Vec<Arc<dyn ToolAdapter>>) -> WorkerPool {
    let mut registry = AdapterRegistry::new();
    for adapter in adapters {
        registry.register(adapter);
    }
    WorkerPool::new(
        Arc::new(registry),
        fast_retry(),
        Arc::new(MetricsCollector::new()),
    )
}

/// Batch of `n` sherlock username jobs with a short timeout.
pub fn username_batch(n: usize) -> Vec<Job> {
    (0..n)
        .map(|i| {
            Job::new(i, ToolKind::Sherlock, Target::Username(format!("user{i}")))
                .with_timeout(Duration::from_millis(500))
                .with_max_retries(3)
        })
        .collect()
}
