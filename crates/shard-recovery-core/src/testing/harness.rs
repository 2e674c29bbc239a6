//! Test harness for integration testing of shard bootstrap.
//!
//! Provides a complete test environment with:
//! - Mock coordination service seeded with a tree
//! - In-memory local store handed out by the replayer
//! - A runner that keeps the recovered shard for inspection

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::bootstrap::{RecoveredShard, ShardBootstrap, ShardRunner};
use crate::config::{LoggingConfig, MetricsConfig, RetryConfig, ShardConfig, ShardSettings};
use crate::coordination::Node;
use crate::error::{BootstrapError, Result, StoreResult};
use crate::journal::JournalOffsetMap;
use crate::metrics::BootstrapMetrics;
use crate::offsets::store_offsets;
use crate::retry::RetryPolicy;
use crate::shard::ShardId;
use crate::store::{LocalStore, MemoryStore, StoreBatch};
use crate::topic::TopicDescription;

use super::fixtures::{topics_fixture, tree_fixture};
use super::mock_coordinator::MockCoordinator;
use super::replayer::MemoryReplayer;

/// Consumer loop double keeping the shard it is handed.
#[derive(Debug)]
pub struct RecordingRunner<S> {
    recovered: Mutex<Option<RecoveredShard<S>>>,
    refusal: Option<String>,
}

impl<S> RecordingRunner<S> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            recovered: Mutex::new(None),
            refusal: None,
        }
    }

    /// A runner refusing every shard with `message`.
    #[must_use]
    pub fn refusing(message: impl Into<String>) -> Self {
        Self {
            recovered: Mutex::new(None),
            refusal: Some(message.into()),
        }
    }

    /// Whether a shard has been handed over.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.recovered.lock().is_some()
    }

    /// Take the handed-over shard.
    #[must_use]
    pub fn take(&self) -> Option<RecoveredShard<S>> {
        self.recovered.lock().take()
    }
}

impl<S> Default for RecordingRunner<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S: Send + 'static> ShardRunner<S> for RecordingRunner<S> {
    async fn start(&self, shard: RecoveredShard<S>) -> Result<()> {
        if let Some(message) = &self.refusal {
            return Err(BootstrapError::Handoff(message.clone()));
        }
        *self.recovered.lock() = Some(shard);
        Ok(())
    }
}

/// Test harness for bootstrap integration testing.
pub struct BootstrapTestHarness {
    /// The mock coordination service
    pub coordinator: Arc<MockCoordinator>,
    /// The store every replay returns
    pub store: Arc<MemoryStore>,
    /// Metrics shared with every bootstrap built by the harness
    pub metrics: BootstrapMetrics,
    /// Runner receiving recovered shards
    pub runner: RecordingRunner<Arc<MemoryStore>>,
    /// Test configuration
    pub config: ShardConfig,
}

impl BootstrapTestHarness {
    /// Create a new test harness with default configuration.
    ///
    /// Default: shard 12 under `/foo` seeded with [`tree_fixture`], consuming
    /// [`topics_fixture`].
    #[must_use]
    pub fn new() -> Self {
        TestHarnessBuilder::new().build()
    }

    /// Build a configuration for `shard` under `root`.
    #[must_use]
    pub fn config_for(shard: ShardId, root: &str, topics: Vec<TopicDescription>) -> ShardConfig {
        ShardConfig {
            shard: ShardSettings {
                id: shard,
                coordination_root: root.to_string(),
                recovery_log_root: "path/to/recovery/logs/".to_string(),
                local_dir: format!("/tmp/shard-recovery-test/{}", shard.name()),
            },
            topics,
            retry: RetryConfig {
                max_attempts: 3,
                initial_backoff_ms: 0,
                max_backoff_ms: 0,
            },
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Create a bootstrap wired to the harness.
    #[must_use]
    pub fn bootstrap(&self) -> ShardBootstrap<MemoryReplayer> {
        self.bootstrap_with(MemoryReplayer::new(self.store.clone()))
    }

    /// Create a bootstrap wired to the harness with a custom replayer.
    #[must_use]
    pub fn bootstrap_with(&self, replayer: MemoryReplayer) -> ShardBootstrap<MemoryReplayer> {
        let retry = RetryPolicy::new(self.config.retry.max_attempts, Duration::ZERO, Duration::ZERO);
        ShardBootstrap::new(&self.config, self.coordinator.clone(), replayer)
            .with_metrics(self.metrics.clone())
            .with_retry(retry)
    }

    /// Persist `offsets` into the local store, as a previous owner would have.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub fn seed_db_offsets(&self, offsets: &JournalOffsetMap) -> StoreResult<()> {
        let mut batch = StoreBatch::new();
        store_offsets(&mut batch, offsets);
        self.store.write(batch)
    }
}

impl Default for BootstrapTestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating test harness with specific configuration.
pub struct TestHarnessBuilder {
    shard: ShardId,
    root: String,
    topics: Vec<TopicDescription>,
    tree: Option<Node>,
    max_attempts: u32,
}

impl TestHarnessBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shard: ShardId(12),
            root: "/foo".to_string(),
            topics: topics_fixture(),
            tree: Some(tree_fixture()),
            max_attempts: 3,
        }
    }

    #[must_use]
    pub fn shard(mut self, shard: u32) -> Self {
        self.shard = ShardId(shard);
        self
    }

    #[must_use]
    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    #[must_use]
    pub fn topics(mut self, topics: Vec<TopicDescription>) -> Self {
        self.topics = topics;
        self
    }

    /// Seed the coordination service with `tree`.
    #[must_use]
    pub fn tree(mut self, tree: Node) -> Self {
        self.tree = Some(tree);
        self
    }

    /// Start with a coordination service holding nothing.
    #[must_use]
    pub fn empty_tree(mut self) -> Self {
        self.tree = None;
        self
    }

    /// Set the coordination retry budget.
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Build the test harness.
    #[must_use]
    pub fn build(self) -> BootstrapTestHarness {
        let coordinator = match &self.tree {
            Some(tree) => MockCoordinator::with_tree(tree),
            None => MockCoordinator::new(),
        };

        let mut config = BootstrapTestHarness::config_for(self.shard, &self.root, self.topics);
        config.retry.max_attempts = self.max_attempts;

        BootstrapTestHarness {
            coordinator: Arc::new(coordinator),
            store: Arc::new(MemoryStore::new()),
            metrics: BootstrapMetrics::new(),
            runner: RecordingRunner::new(),
            config,
        }
    }
}

impl Default for TestHarnessBuilder {
    fn default() -> Self {
        Self::new()
    }
}
