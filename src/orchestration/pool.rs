//! Worker pool: bounded-concurrency execution of a batch of jobs.
//!
//! The pool dispatches jobs into a fixed number of concurrent slots,
//! wraps every adapter invocation in the retry policy and a hard timeout,
//! and blocks the caller until every job has a terminal result. Progress
//! is streamed through an optional event channel; the return value never
//! carries partial results.

use futures::FutureExt;
use std::cmp::Reverse;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::adapters::{AdapterRegistry, ToolAdapter};
use crate::core::{Attempt, ErrorKind, Job, JobId, JobResult, Outcome, ResultSet, ToolKind};
use crate::orchestration::aggregator::ResultAggregator;
use crate::orchestration::limiter::RateLimiter;
use crate::orchestration::metrics::MetricsCollector;
use crate::orchestration::retry::RetryPolicy;
use crate::{klog, klog_debug, klog_warn, Error, Result};

/// Events emitted by the pool for streaming progress.
///
/// This is a side channel: callers wanting live updates subscribe here,
/// the batch result always comes back complete from `run_batch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolEvent {
    /// A job was dispatched into a free slot.
    JobStarted {
        job_id: JobId,
        tool: ToolKind,
        index: usize,
    },
    /// One attempt reached an outcome (the job may still be retried).
    AttemptFinished {
        job_id: JobId,
        tool: ToolKind,
        attempt: u32,
        outcome: &'static str,
    },
    /// A job reached its terminal result.
    JobFinished {
        job_id: JobId,
        tool: ToolKind,
        index: usize,
        outcome: &'static str,
    },
    /// The batch was cancelled; pending jobs resolve to Cancelled.
    BatchCancelled,
}

/// Bounded-concurrency executor for job batches.
pub struct WorkerPool {
    registry: Arc<AdapterRegistry>,
    retry: RetryPolicy,
    metrics: Arc<MetricsCollector>,
    limiter: Arc<RateLimiter>,
    cancel: CancellationToken,
    event_tx: Option<mpsc::Sender<PoolEvent>>,
}

impl WorkerPool {
    pub fn new(
        registry: Arc<AdapterRegistry>,
        retry: RetryPolicy,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            registry,
            retry,
            metrics,
            limiter: Arc::new(RateLimiter::unlimited()),
            cancel: CancellationToken::new(),
            event_tx: None,
        }
    }

    /// Install a shared dispatch rate limiter.
    pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    /// Subscribe to progress events. Events are delivered best-effort:
    /// a slow subscriber drops events rather than stalling the pool.
    pub fn with_events(mut self, event_tx: mpsc::Sender<PoolEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Token that cancels the whole batch when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn emit(&self, event: PoolEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.try_send(event);
        }
    }

    /// Execute `jobs` with at most `concurrency_limit` running at once.
    ///
    /// Returns one result per job once every job is terminal, ordered by
    /// `job.index`; indices must cover `0..jobs.len()` exactly once.
    /// Individual tool failures never surface as errors here; only
    /// internal faults (bad indices, bad limit) do.
    pub async fn run_batch(
        &self,
        jobs: Vec<Job>,
        concurrency_limit: usize,
    ) -> Result<ResultSet> {
        if concurrency_limit == 0 {
            return Err(Error::InvalidConcurrency(concurrency_limit));
        }
        if jobs.is_empty() {
            return Ok(ResultSet::default());
        }

        let total = jobs.len();
        klog!(
            "run_batch: {} jobs, concurrency_limit={}",
            total,
            concurrency_limit
        );

        let aggregator = ResultAggregator::new(total);

        // Pending queue: priority desc, then submission index. Each job's
        // own `index` names its result slot, so the batch may be handed
        // over in any order; the aggregator rejects duplicate or
        // out-of-range indices as a caller bug.
        let mut pending: VecDeque<Job> = {
            let mut jobs = jobs;
            jobs.sort_by_key(|job| (Reverse(job.priority), job.index));
            jobs.into()
        };

        let (done_tx, mut done_rx) = mpsc::channel::<(usize, JobResult)>(total);
        let mut in_flight = 0usize;
        let mut cancel_drained = false;

        loop {
            // Fill free slots from the pending queue.
            while in_flight < concurrency_limit && !self.cancel.is_cancelled() {
                let Some(job) = pending.pop_front() else {
                    break;
                };
                self.dispatch(job, done_tx.clone());
                in_flight += 1;
            }

            // Once cancelled, everything still pending resolves directly.
            if self.cancel.is_cancelled() && !cancel_drained {
                cancel_drained = true;
                self.emit(PoolEvent::BatchCancelled);
                while let Some(job) = pending.pop_front() {
                    klog_debug!("job {} cancelled before dispatch", job.id);
                    let slot = job.index;
                    let result = JobResult {
                        job_id: job.id,
                        tool: job.tool,
                        target: job.target,
                        outcome: Outcome::Cancelled,
                        total_attempts: 0,
                        total_duration: Duration::ZERO,
                    };
                    aggregator.record(slot, result)?;
                }
            }

            if in_flight == 0 && pending.is_empty() {
                break;
            }

            tokio::select! {
                completed = done_rx.recv() => {
                    // done_tx is held by the loop, so recv cannot return
                    // None while workers remain.
                    let Some((slot, result)) = completed else { break };
                    in_flight -= 1;
                    self.emit(PoolEvent::JobFinished {
                        job_id: result.job_id,
                        tool: result.tool,
                        index: slot,
                        outcome: result.outcome.kind_str(),
                    });
                    aggregator.record(slot, result)?;
                }
                _ = self.cancel.cancelled(), if !cancel_drained => {
                    // Loop back around to drain the pending queue.
                }
            }
        }

        aggregator.finalize()
    }

    fn dispatch(&self, job: Job, done_tx: mpsc::Sender<(usize, JobResult)>) {
        let slot = job.index;
        self.emit(PoolEvent::JobStarted {
            job_id: job.id,
            tool: job.tool,
            index: slot,
        });

        let Some(adapter) = self.registry.get(job.tool) else {
            // No adapter for the tag: still exactly one result per job.
            klog_warn!("no adapter registered for {}", job.tool);
            let result = JobResult {
                job_id: job.id,
                tool: job.tool,
                target: job.target.clone(),
                outcome: Outcome::Failure {
                    kind: ErrorKind::Permanent,
                    message: format!("no adapter registered for {}", job.tool),
                    duration: Duration::ZERO,
                },
                total_attempts: 0,
                total_duration: Duration::ZERO,
            };
            let _ = done_tx.try_send((slot, result));
            return;
        };

        let retry = self.retry.clone();
        let metrics = Arc::clone(&self.metrics);
        let limiter = Arc::clone(&self.limiter);
        let cancel = self.cancel.clone();
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let result =
                run_job(job, adapter, retry, metrics, limiter, cancel, event_tx).await;
            // The receiver only closes after all results arrive; a failed
            // send means the batch already tore down.
            let _ = done_tx.send((slot, result)).await;
        });
    }
}

/// Drive one job through its retry budget to a terminal result.
async fn run_job(
    job: Job,
    adapter: Arc<dyn ToolAdapter>,
    retry: RetryPolicy,
    metrics: Arc<MetricsCollector>,
    limiter: Arc<RateLimiter>,
    cancel: CancellationToken,
    event_tx: Option<mpsc::Sender<PoolEvent>>,
) -> JobResult {
    let job_start = Instant::now();
    let mut attempts = 0u32;

    let final_outcome = loop {
        // Rate limit applies to every attempt, not just the first: a
        // retry hits the upstream service the same as a fresh dispatch.
        if !limiter.acquire(job.tool, &cancel).await {
            break Outcome::Cancelled;
        }

        attempts += 1;
        let started_at = chrono::Utc::now();
        let outcome = run_attempt(&job, adapter.as_ref(), &cancel).await;
        let retrying = retry.should_retry(&job, &outcome, attempts) && !cancel.is_cancelled();

        metrics.observe(Attempt {
            job_id: job.id,
            tool: job.tool,
            number: attempts,
            started_at,
            duration: outcome.duration(),
            outcome: outcome.kind_str().to_string(),
            retried: retrying,
        });
        if let Some(tx) = &event_tx {
            let _ = tx.try_send(PoolEvent::AttemptFinished {
                job_id: job.id,
                tool: job.tool,
                attempt: attempts,
                outcome: outcome.kind_str(),
            });
        }

        if !retrying {
            break outcome;
        }

        klog_debug!(
            "job {} attempt {} failed ({}), backing off",
            job.id,
            attempts,
            outcome.kind_str()
        );
        if !retry.wait_backoff(attempts + 1, &cancel).await {
            break Outcome::Cancelled;
        }
    };

    if !final_outcome.is_success() {
        klog_warn!(
            "job {} ({} on {}) finished {}: {}",
            job.id,
            job.tool,
            job.target,
            final_outcome.kind_str(),
            final_outcome.message().unwrap_or_default()
        );
    }

    JobResult {
        job_id: job.id,
        tool: job.tool,
        target: job.target,
        outcome: final_outcome,
        total_attempts: attempts,
        total_duration: job_start.elapsed(),
    }
}

/// One attempt: the adapter invocation raced against the job timeout and
/// the batch cancellation token.
///
/// Dropping the invocation future on timeout/cancel terminates subprocess
/// children (adapters spawn with `kill_on_drop`), so no external call
/// outlives the attempt. An adapter panic is caught and classified as
/// `AdapterCrash`; it never reaches the pool loop.
async fn run_attempt(job: &Job, adapter: &dyn ToolAdapter, cancel: &CancellationToken) -> Outcome {
    let start = Instant::now();
    let invocation = AssertUnwindSafe(adapter.invoke(&job.target)).catch_unwind();

    tokio::select! {
        result = invocation => {
            let duration = start.elapsed();
            match result {
                Ok(Ok(data)) => Outcome::Success { data, duration },
                Ok(Err(err)) => Outcome::Failure {
                    kind: err.kind,
                    message: err.message,
                    duration,
                },
                Err(panic) => Outcome::Failure {
                    kind: ErrorKind::AdapterCrash,
                    message: panic_message(panic),
                    duration,
                },
            }
        }
        _ = tokio::time::sleep(job.timeout) => Outcome::TimedOut { duration: start.elapsed() },
        _ = cancel.cancelled() => Outcome::Cancelled,
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("adapter panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("adapter panicked: {s}")
    } else {
        "adapter panicked".to_string()
    }
}
