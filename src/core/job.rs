//! Job descriptions for the worker pool.
//!
//! A [`Job`] is one unit of work: run one tool against one target, under a
//! timeout and a retry budget. Jobs are immutable once submitted; the pool
//! identifies them by their submission index within the batch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Unique identifier for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is enough for logs
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Capability tag for the integrated OSINT tools.
///
/// The worker pool never matches on this beyond routing a job to the
/// adapter registered for the tag, so adding a tool means adding a
/// variant and an adapter, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Sherlock,
    Maigret,
    Holehe,
    PhoneInfoga,
    ExifTool,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        ToolKind::Sherlock,
        ToolKind::Maigret,
        ToolKind::Holehe,
        ToolKind::PhoneInfoga,
        ToolKind::ExifTool,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::Sherlock => "sherlock",
            ToolKind::Maigret => "maigret",
            ToolKind::Holehe => "holehe",
            ToolKind::PhoneInfoga => "phoneinfoga",
            ToolKind::ExifTool => "exiftool",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "sherlock" => Some(ToolKind::Sherlock),
            "maigret" => Some(ToolKind::Maigret),
            "holehe" => Some(ToolKind::Holehe),
            "phoneinfoga" => Some(ToolKind::PhoneInfoga),
            "exiftool" => Some(ToolKind::ExifTool),
            _ => None,
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input value a tool runs against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Username(String),
    Email(String),
    Phone(String),
    File(PathBuf),
}

impl Target {
    /// Display form used in logs and reports.
    pub fn value(&self) -> String {
        match self {
            Target::Username(u) => u.clone(),
            Target::Email(e) => e.clone(),
            Target::Phone(p) => p.clone(),
            Target::File(p) => p.display().to_string(),
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            Target::Username(_) => "username",
            Target::Email(_) => "email",
            Target::Phone(_) => "phone",
            Target::File(_) => "file",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.kind_str(), self.value())
    }
}

/// One unit of work for the pool: which tool, which target, and the
/// timeout/retry budget it runs under.
#[derive(Debug, Clone)]
pub struct Job {
    /// Unique identifier for this job.
    pub id: JobId,
    /// Submission index within the batch; fixes the result order.
    pub index: usize,
    /// The tool capability to invoke.
    pub tool: ToolKind,
    /// The input the tool runs against.
    pub target: Target,
    /// Hard wall-clock limit for a single attempt.
    pub timeout: Duration,
    /// How many re-attempts are allowed after the first.
    pub max_retries: u32,
    /// Dispatch-ordering tie-break only; higher runs earlier.
    pub priority: i32,
}

impl Job {
    pub fn new(index: usize, tool: ToolKind, target: Target) -> Self {
        Self {
            id: JobId::new(),
            index,
            tool,
            target,
            timeout: Duration::from_secs(300),
            max_retries: 3,
            priority: 0,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}
