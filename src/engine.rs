//! Engine: expands raw targets into jobs and drives them through the pool.
//!
//! One engine owns one batch pipeline: config-derived retry policy and
//! rate limits, a shared metrics collector, and the worker pool with its
//! cancellation token. The CLI wires ctrl-c to `cancellation_token()`.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::adapters::AdapterRegistry;
use crate::config::Config;
use crate::core::{Job, ResultSet, Target, ToolKind};
use crate::orchestration::{
    MetricsCollector, MetricsSnapshot, PoolEvent, RateLimiter, RetryPolicy, WorkerPool,
};
use crate::{klog, validators, Result};

/// Which tools run for each target kind. Usernames fan out to both
/// username hunters; the other kinds map one-to-one.
fn tools_for(target: &Target) -> &'static [ToolKind] {
    match target {
        Target::Username(_) => &[ToolKind::Sherlock, ToolKind::Maigret],
        Target::Email(_) => &[ToolKind::Holehe],
        Target::Phone(_) => &[ToolKind::PhoneInfoga],
        Target::File(_) => &[ToolKind::ExifTool],
    }
}

pub struct OsintEngine {
    config: Config,
    pool: WorkerPool,
    metrics: Arc<MetricsCollector>,
}

impl OsintEngine {
    /// Engine with the built-in adapter set.
    pub fn new(config: Config) -> Self {
        Self::with_registry(config, AdapterRegistry::builtin())
    }

    /// Engine with a caller-supplied adapter set (tests swap in scripted
    /// adapters here).
    pub fn with_registry(config: Config, registry: AdapterRegistry) -> Self {
        let metrics = Arc::new(MetricsCollector::new());
        let retry = RetryPolicy::new(
            config.base_delay(),
            config.max_delay(),
            config.retry_on_timeout,
        );

        let mut intervals = HashMap::new();
        for (name, tool_config) in &config.tools {
            if let (Some(kind), Some(interval)) =
                (ToolKind::from_str_opt(name), tool_config.min_interval())
            {
                intervals.insert(kind, interval);
            }
        }

        let pool = WorkerPool::new(Arc::new(registry), retry, Arc::clone(&metrics))
            .with_limiter(Arc::new(RateLimiter::new(intervals)));

        Self {
            config,
            pool,
            metrics,
        }
    }

    /// Stream pool progress events to `tx`.
    pub fn with_events(mut self, tx: mpsc::Sender<PoolEvent>) -> Self {
        self.pool = self.pool.with_events(tx);
        self
    }

    /// Token that aborts the running batch when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.pool.cancellation_token()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Expand targets into jobs. Every target is validated up front; one
    /// bad target rejects the whole plan before anything runs.
    ///
    /// Job indices follow expansion order, so the result set lines up
    /// with the order targets were given.
    pub fn plan(&self, targets: &[Target]) -> Result<Vec<Job>> {
        let mut jobs = Vec::new();
        for target in targets {
            validators::validate_target(target)?;
            for &kind in tools_for(target) {
                let tool_config = self.config.tool(kind);
                jobs.push(
                    Job::new(jobs.len(), kind, target.clone())
                        .with_timeout(tool_config.timeout_duration())
                        .with_max_retries(tool_config.max_retries)
                        .with_priority(tool_config.priority),
                );
            }
        }
        klog!("planned {} jobs from {} targets", jobs.len(), targets.len());
        Ok(jobs)
    }

    /// Run a batch to completion and snapshot the metrics it produced.
    pub async fn run(&self, jobs: Vec<Job>) -> Result<(ResultSet, MetricsSnapshot)> {
        let results = self
            .pool
            .run_batch(jobs, self.config.concurrency_limit)
            .await?;
        Ok((results, self.metrics.snapshot()))
    }
}
