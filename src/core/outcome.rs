//! Attempt outcomes and terminal job results.
//!
//! An [`Outcome`] is the result of a single attempt; a [`JobResult`] is the
//! terminal state of a job after its retry budget is exhausted. The
//! [`ResultSet`] preserves submission order so reports are deterministic no
//! matter how the batch actually interleaved.

use crate::core::job::{JobId, Target, ToolKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Classification of non-success outcomes.
///
/// The tags are stable: adapters must map their expected failure classes
/// onto them, and the retry policy keys off them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Retryable: network timeout, connection refused, rate-limited.
    Transient,
    /// Not retryable: invalid target, missing binary, misconfiguration.
    Permanent,
    /// Unexpected internal error in the adapter (caught panic).
    AdapterCrash,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Transient => "transient",
            ErrorKind::Permanent => "permanent",
            ErrorKind::AdapterCrash => "adapter_crash",
        }
    }
}

/// Result of one attempt. Exactly one variant; never both success and
/// failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success {
        /// Adapter-defined payload; the pool never inspects it.
        data: serde_json::Value,
        duration: Duration,
    },
    Failure {
        kind: ErrorKind,
        message: String,
        duration: Duration,
    },
    TimedOut {
        duration: Duration,
    },
    Cancelled,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Elapsed time of the attempt that produced this outcome.
    pub fn duration(&self) -> Duration {
        match self {
            Outcome::Success { duration, .. }
            | Outcome::Failure { duration, .. }
            | Outcome::TimedOut { duration } => *duration,
            Outcome::Cancelled => Duration::ZERO,
        }
    }

    /// Short tag for metrics and logs.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "success",
            Outcome::Failure { kind, .. } => kind.as_str(),
            Outcome::TimedOut { .. } => "timed_out",
            Outcome::Cancelled => "cancelled",
        }
    }

    /// Human-readable message for non-success outcomes.
    pub fn message(&self) -> Option<String> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Failure { message, .. } => Some(message.clone()),
            Outcome::TimedOut { duration } => {
                Some(format!("timed out after {:.1}s", duration.as_secs_f64()))
            }
            Outcome::Cancelled => Some("cancelled".to_string()),
        }
    }
}

/// One execution try of a job, as observed by the metrics collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub job_id: JobId,
    pub tool: ToolKind,
    /// 1-based attempt number.
    pub number: u32,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    /// Outcome tag of this attempt ("success", "transient", ...).
    pub outcome: String,
    /// Whether the retry policy scheduled another attempt after this one.
    pub retried: bool,
}

/// Terminal state of a job after all attempts are exhausted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: JobId,
    pub tool: ToolKind,
    pub target: Target,
    pub outcome: Outcome,
    pub total_attempts: u32,
    pub total_duration: Duration,
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Ordered collection of results for one batch.
///
/// Order equals submission order of the originating jobs, not completion
/// order. Length always equals the number of submitted jobs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet {
    results: Vec<JobResult>,
}

impl ResultSet {
    pub(crate) fn from_ordered(results: Vec<JobResult>) -> Self {
        Self { results }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, JobResult> {
        self.results.iter()
    }

    pub fn get(&self, index: usize) -> Option<&JobResult> {
        self.results.get(index)
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// True if at least one job succeeded; drives the process exit code.
    pub fn any_success(&self) -> bool {
        self.results.iter().any(|r| r.is_success())
    }
}

impl IntoIterator for ResultSet {
    type Item = JobResult;
    type IntoIter = std::vec::IntoIter<JobResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a JobResult;
    type IntoIter = std::slice::Iter<'a, JobResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
