//! Prometheus metrics for shard bootstrap.

use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

/// Bootstrap metrics collection.
///
/// Cloning shares the underlying metrics.
#[derive(Clone)]
pub struct BootstrapMetrics {
    /// The Prometheus registry.
    pub registry: Registry,

    /// Bootstrap runs started.
    pub bootstrap_attempts: IntCounter,

    /// Bootstrap failures by the state the machine was leaving.
    pub bootstrap_failures: IntCounterVec,

    /// Coordination requests retried after a transient error.
    pub coordination_retries: IntCounter,

    /// Hints writes accepted by the coordination service.
    pub hints_stored: IntCounter,

    /// Offsets handed to the consumer loop by the last bootstrap.
    pub reconciled_offsets: IntGauge,

    /// Wall time from first step to hand-off.
    pub bootstrap_duration_seconds: Histogram,
}

impl BootstrapMetrics {
    /// Create a new metrics collection.
    ///
    /// # Panics
    ///
    /// Panics if metric registration fails (should not happen with unique names).
    #[must_use]
    pub fn new() -> Self {
        let registry = Registry::new();

        let bootstrap_attempts = IntCounter::new(
            "shard_bootstrap_attempts_total",
            "Total number of shard bootstrap runs started",
        )
        .expect("metric creation should succeed");

        let bootstrap_failures = IntCounterVec::new(
            Opts::new(
                "shard_bootstrap_failures_total",
                "Total number of failed shard bootstraps by state",
            ),
            &["state"],
        )
        .expect("metric creation should succeed");

        let coordination_retries = IntCounter::new(
            "shard_coordination_retries_total",
            "Total number of coordination requests retried after transient errors",
        )
        .expect("metric creation should succeed");

        let hints_stored = IntCounter::new(
            "shard_hints_stored_total",
            "Total number of hints written to the coordination service",
        )
        .expect("metric creation should succeed");

        let reconciled_offsets = IntGauge::new(
            "shard_reconciled_offsets",
            "Number of journal offsets reconciled by the last bootstrap",
        )
        .expect("metric creation should succeed");

        let bootstrap_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "shard_bootstrap_duration_seconds",
                "Shard bootstrap duration in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0]),
        )
        .expect("metric creation should succeed");

        registry
            .register(Box::new(bootstrap_attempts.clone()))
            .expect("metric registration should succeed");
        registry
            .register(Box::new(bootstrap_failures.clone()))
            .expect("metric registration should succeed");
        registry
            .register(Box::new(coordination_retries.clone()))
            .expect("metric registration should succeed");
        registry
            .register(Box::new(hints_stored.clone()))
            .expect("metric registration should succeed");
        registry
            .register(Box::new(reconciled_offsets.clone()))
            .expect("metric registration should succeed");
        registry
            .register(Box::new(bootstrap_duration_seconds.clone()))
            .expect("metric registration should succeed");

        Self {
            registry,
            bootstrap_attempts,
            bootstrap_failures,
            coordination_retries,
            hints_stored,
            reconciled_offsets,
            bootstrap_duration_seconds,
        }
    }

    pub fn record_attempt(&self) {
        self.bootstrap_attempts.inc();
    }

    /// Record a bootstrap failing while in `state`.
    pub fn record_failure(&self, state: &str) {
        self.bootstrap_failures.with_label_values(&[state]).inc();
    }

    pub fn record_hints_stored(&self) {
        self.hints_stored.inc();
    }

    /// Set the number of offsets the last bootstrap reconciled.
    pub fn set_reconciled_offsets(&self, count: usize) {
        self.reconciled_offsets
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    pub fn record_duration(&self, duration_seconds: f64) {
        self.bootstrap_duration_seconds.observe(duration_seconds);
    }

    /// Encode metrics in Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = String::new();
        encoder.encode_utf8(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

impl Default for BootstrapMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BootstrapMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapMetrics")
            .field("bootstrap_attempts", &self.bootstrap_attempts.get())
            .field("coordination_retries", &self.coordination_retries.get())
            .finish_non_exhaustive()
    }
}
