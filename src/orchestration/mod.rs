//! Batch execution machinery: the worker pool and its supporting pieces.

pub mod aggregator;
pub mod limiter;
pub mod metrics;
pub mod pool;
pub mod retry;

pub use aggregator::ResultAggregator;
pub use limiter::RateLimiter;
pub use metrics::{MetricsCollector, MetricsSnapshot, ToolStats};
pub use pool::{PoolEvent, WorkerPool};
pub use retry::RetryPolicy;
