//! Metrics collection for shard bootstrap.
//!
//! Provides Prometheus-compatible metrics for monitoring recovery attempts,
//! coordination retries and reconciled offsets.

mod registry;

pub use self::registry::BootstrapMetrics;
