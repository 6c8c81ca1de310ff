//! Process-wide metrics for tool executions.
//!
//! One [`MetricsCollector`] lives for the whole run. Workers call
//! `observe` for every attempt; report generation reads a [`MetricsSnapshot`]
//! once the batch is done. `observe` only bumps counters under a short
//! mutex hold, so it never stalls the pool.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::core::{Attempt, ToolKind};

/// Accumulated stats for one tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolStats {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub cancellations: u64,
    /// Attempts that were followed by a retry.
    pub retries: u64,
    pub total_duration: Duration,
    /// Failure counts keyed by outcome tag ("transient", "permanent", ...).
    pub errors_by_kind: HashMap<String, u64>,
}

impl ToolStats {
    pub fn average_duration(&self) -> Duration {
        if self.attempts == 0 {
            return Duration::ZERO;
        }
        self.total_duration / self.attempts as u32
    }

    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        self.successes as f64 / self.attempts as f64 * 100.0
    }

    fn record(&mut self, attempt: &Attempt) {
        self.attempts += 1;
        self.total_duration += attempt.duration;
        if attempt.retried {
            self.retries += 1;
        }
        match attempt.outcome.as_str() {
            "success" => self.successes += 1,
            "timed_out" => {
                self.timeouts += 1;
                *self
                    .errors_by_kind
                    .entry(attempt.outcome.clone())
                    .or_default() += 1;
            }
            "cancelled" => self.cancellations += 1,
            other => {
                self.failures += 1;
                *self.errors_by_kind.entry(other.to_string()).or_default() += 1;
            }
        }
    }
}

/// Point-in-time view of all collected metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub started_at: DateTime<Utc>,
    pub taken_at: DateTime<Utc>,
    pub tools: HashMap<String, ToolStats>,
}

impl MetricsSnapshot {
    pub fn uptime(&self) -> Duration {
        (self.taken_at - self.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    pub fn tool(&self, kind: ToolKind) -> Option<&ToolStats> {
        self.tools.get(kind.as_str())
    }

    pub fn total_attempts(&self) -> u64 {
        self.tools.values().map(|s| s.attempts).sum()
    }
}

struct Inner {
    tools: HashMap<String, ToolStats>,
    attempts: Vec<Attempt>,
}

/// Observability sink for the worker pool.
///
/// Initialized once per process run, shared by handle (`Arc`), read only
/// at report time, discarded at exit.
pub struct MetricsCollector {
    started_at: DateTime<Utc>,
    inner: Mutex<Inner>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            inner: Mutex::new(Inner {
                tools: HashMap::new(),
                attempts: Vec::new(),
            }),
        }
    }

    /// Record one attempt. Cheap: a push and a few counter bumps.
    pub fn observe(&self, attempt: Attempt) {
        let mut inner = self.inner.lock().expect("metrics lock poisoned");
        inner
            .tools
            .entry(attempt.tool.as_str().to_string())
            .or_default()
            .record(&attempt);
        inner.attempts.push(attempt);
    }

    /// Aggregate stats across all tools observed so far.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.lock().expect("metrics lock poisoned");
        MetricsSnapshot {
            started_at: self.started_at,
            taken_at: Utc::now(),
            tools: inner.tools.clone(),
        }
    }

    /// Full attempt log, in observation order.
    pub fn attempts(&self) -> Vec<Attempt> {
        self.inner
            .lock()
            .expect("metrics lock poisoned")
            .attempts
            .clone()
    }
}
