//! Core value types shared by the orchestration layer and adapters.

pub mod job;
pub mod outcome;

pub use job::{Job, JobId, Target, ToolKind};
pub use outcome::{Attempt, ErrorKind, JobResult, Outcome, ResultSet};
