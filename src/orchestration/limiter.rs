//! Shared dispatch rate limiter.
//!
//! Some wrapped tools hammer rate-limited upstream services. Rather than
//! teaching each adapter about spacing, the worker pool consults this
//! limiter before dispatch: it enforces a minimum interval between starts
//! of jobs for the same tool. Tools without a configured interval pass
//! through untouched.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::core::ToolKind;

/// Minimum-interval limiter keyed by tool.
pub struct RateLimiter {
    intervals: HashMap<ToolKind, Duration>,
    last_dispatch: Mutex<HashMap<ToolKind, Instant>>,
}

impl RateLimiter {
    pub fn new(intervals: HashMap<ToolKind, Duration>) -> Self {
        Self {
            intervals,
            last_dispatch: Mutex::new(HashMap::new()),
        }
    }

    /// A limiter that never delays anything.
    pub fn unlimited() -> Self {
        Self::new(HashMap::new())
    }

    /// Wait until `kind` may be dispatched, claiming the slot on return.
    ///
    /// Returns false if the batch was cancelled while waiting.
    pub async fn acquire(&self, kind: ToolKind, cancel: &CancellationToken) -> bool {
        let Some(interval) = self.intervals.get(&kind).copied() else {
            return true;
        };

        loop {
            let wait = {
                let mut last = self.last_dispatch.lock().expect("limiter lock poisoned");
                let now = Instant::now();
                match last.get(&kind) {
                    Some(prev) if now.duration_since(*prev) < interval => {
                        Some(interval - now.duration_since(*prev))
                    }
                    _ => {
                        last.insert(kind, now);
                        None
                    }
                }
            };

            match wait {
                None => return true,
                Some(delay) => {
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancel.cancelled() => return false,
                    }
                }
            }
        }
    }
}
