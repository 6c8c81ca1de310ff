//! Tool adapters: one per integrated OSINT utility.
//!
//! Adapters implement a uniform invocation contract so the worker pool
//! stays tool-agnostic. Expected failures (missing binary, non-zero exit,
//! unparseable output, invalid target) surface as [`AdapterError`] with a
//! stable [`ErrorKind`]; only genuine programming errors panic, and the
//! pool converts those to `AdapterCrash`.

mod exiftool;
mod holehe;
mod maigret;
mod phoneinfoga;
mod sherlock;

pub use exiftool::ExifToolAdapter;
pub use holehe::HoleheAdapter;
pub use maigret::MaigretAdapter;
pub use phoneinfoga::PhoneInfogaAdapter;
pub use sherlock::SherlockAdapter;

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

use crate::core::{ErrorKind, Target, ToolKind};
use crate::klog_trace;

/// Expected failure of an adapter invocation.
#[derive(Debug, Clone)]
pub struct AdapterError {
    pub kind: ErrorKind,
    pub message: String,
}

impl AdapterError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Permanent,
            message: message.into(),
        }
    }
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for AdapterError {}

/// Uniform invocation contract for wrapped tools.
///
/// Implementations must be safe to invoke concurrently for different
/// jobs: no shared mutable state. Rate limiting lives in the pool's
/// limiter, not here.
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    /// Capability tag this adapter serves.
    fn kind(&self) -> ToolKind;

    /// Whether this adapter can run against the given target type.
    fn accepts(&self, target: &Target) -> bool;

    /// Run the tool against the target.
    ///
    /// The caller enforces the timeout; the future must tolerate being
    /// dropped mid-flight (subprocess children are spawned with
    /// `kill_on_drop` so no zombies survive a timeout or cancellation).
    async fn invoke(&self, target: &Target) -> Result<serde_json::Value, AdapterError>;
}

/// Registry mapping capability tags to adapters.
pub struct AdapterRegistry {
    adapters: HashMap<ToolKind, Arc<dyn ToolAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Registry with all five built-in tool adapters.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SherlockAdapter::new()));
        registry.register(Arc::new(MaigretAdapter::new()));
        registry.register(Arc::new(HoleheAdapter::new()));
        registry.register(Arc::new(PhoneInfogaAdapter::new()));
        registry.register(Arc::new(ExifToolAdapter::new()));
        registry
    }

    pub fn register(&mut self, adapter: Arc<dyn ToolAdapter>) {
        self.adapters.insert(adapter.kind(), adapter);
    }

    pub fn get(&self, kind: ToolKind) -> Option<Arc<dyn ToolAdapter>> {
        self.adapters.get(&kind).cloned()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Fail with a permanent error if `binary` is not on PATH.
pub(crate) fn require_binary(binary: &str) -> Result<(), AdapterError> {
    which::which(binary)
        .map(|_| ())
        .map_err(|_| AdapterError::permanent(format!("required binary not found: {binary}")))
}

/// Run a subprocess to completion, returning its stdout.
///
/// The child is spawned with `kill_on_drop` so the process is terminated
/// if the invocation future is dropped (timeout or cancellation). A
/// non-zero exit is classified transient: the tools exit non-zero on
/// network hiccups far more often than on bad input, and bad input is
/// rejected before we get here.
pub(crate) async fn run_command(
    program: &str,
    args: &[&str],
) -> Result<String, AdapterError> {
    klog_trace!("exec: {} {}", program, args.join(" "));
    let output = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AdapterError::permanent(format!("binary not found: {program}"))
            } else {
                AdapterError::transient(format!("failed to spawn {program}: {e}"))
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = if stderr.trim().is_empty() {
            format!("{program} exited with {}", output.status)
        } else {
            format!("{program} failed: {}", stderr.trim())
        };
        return Err(AdapterError::transient(message));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
