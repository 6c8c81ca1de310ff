pub mod adapters;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod log;
pub mod orchestration;
pub mod report;
pub mod validators;

pub use config::Config;
pub use core::{Job, JobId, JobResult, Outcome, ResultSet, Target, ToolKind};
pub use engine::OsintEngine;
pub use error::{Error, Result};
pub use orchestration::{MetricsCollector, MetricsSnapshot, PoolEvent, RetryPolicy, WorkerPool};
pub use report::{ReportFormat, ReportGenerator};
