//! Shard bootstrap state machine.
//!
//! Recovers a shard in five steps, each advancing the machine one state:
//!
//! ```text
//! Unstarted -> HintsLoaded -> LogReplayed -> PartitionsAssigned
//!           -> OffsetsReconciled -> Running
//! ```
//!
//! Any step error moves the machine to the terminal `Failed` state. Nothing is
//! handed to the consumer loop before offsets are reconciled, so a failed
//! bootstrap has no observable effect besides the rebuilt local store.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::config::ShardConfig;
use crate::coordination::{CoordinationClient, Node};
use crate::error::{BootstrapError, CoordinationError, ReplayError, Result};
use crate::hints::{self, FsmHints, HintsWriter};
use crate::journal::JournalOffsetMap;
use crate::mapper::ShardAssignment;
use crate::metrics::BootstrapMetrics;
use crate::offsets;
use crate::retry::RetryPolicy;
use crate::shard::ShardId;
use crate::store::{LocalStore, RocksStore};
use crate::topic::TopicDescription;

/// Progress of a [`ShardBootstrap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootstrapState {
    Unstarted,
    HintsLoaded,
    LogReplayed,
    PartitionsAssigned,
    OffsetsReconciled,
    Running,
    Failed,
}

impl BootstrapState {
    /// Label used in logs and metrics.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unstarted => "unstarted",
            Self::HintsLoaded => "hints_loaded",
            Self::LogReplayed => "log_replayed",
            Self::PartitionsAssigned => "partitions_assigned",
            Self::OffsetsReconciled => "offsets_reconciled",
            Self::Running => "running",
            Self::Failed => "failed",
        }
    }

    /// The state a successful step moves to, or `None` from a terminal state.
    #[must_use]
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Unstarted => Some(Self::HintsLoaded),
            Self::HintsLoaded => Some(Self::LogReplayed),
            Self::LogReplayed => Some(Self::PartitionsAssigned),
            Self::PartitionsAssigned => Some(Self::OffsetsReconciled),
            Self::OffsetsReconciled => Some(Self::Running),
            Self::Running | Self::Failed => None,
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.next().is_none()
    }
}

impl fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rebuilds a shard's local store from its recovery log.
#[async_trait]
pub trait RecoveryLogReplayer: Send + Sync {
    type Store: LocalStore + 'static;

    /// Replay the log described by `hints` into `local_dir` and open the
    /// resulting store.
    async fn replay(
        &self,
        hints: &FsmHints,
        local_dir: &Path,
    ) -> std::result::Result<Self::Store, ReplayError>;
}

/// Replayer for shards whose local directory was restored out of band.
///
/// Replays nothing and opens the RocksDB store found in the local directory,
/// creating an empty one if there is none.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExistingStoreReplayer;

#[async_trait]
impl RecoveryLogReplayer for ExistingStoreReplayer {
    type Store = RocksStore;

    async fn replay(
        &self,
        hints: &FsmHints,
        local_dir: &Path,
    ) -> std::result::Result<RocksStore, ReplayError> {
        RocksStore::open(local_dir).map_err(|err| ReplayError {
            journal: hints.log_mark.journal.to_string(),
            message: err.to_string(),
        })
    }
}

/// Everything the consumer loop needs to take over a recovered shard.
#[derive(Debug)]
pub struct RecoveredShard<S> {
    pub shard: ShardId,
    pub hints: FsmHints,
    /// Reconciled read offsets of the owned journals.
    pub offsets: JournalOffsetMap,
    pub assignment: ShardAssignment,
    pub store: S,
    /// Writer for hints the consumer loop records from here on.
    pub hints_writer: HintsWriter,
}

/// The consumer loop taking over a recovered shard.
#[async_trait]
pub trait ShardRunner<S: Send + 'static>: Send + Sync {
    /// Take ownership of `shard`.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Handoff`] if the shard cannot be started.
    async fn start(&self, shard: RecoveredShard<S>) -> Result<()>;
}

/// Drives one shard through recovery.
pub struct ShardBootstrap<R: RecoveryLogReplayer> {
    shard: ShardId,
    coordination_root: String,
    recovery_log_root: String,
    local_dir: PathBuf,
    topics: Vec<TopicDescription>,

    client: Arc<dyn CoordinationClient>,
    replayer: R,
    retry: RetryPolicy,
    metrics: Option<BootstrapMetrics>,

    state: BootstrapState,
    started_at: Option<Instant>,
    tree: Option<Node>,
    hints: Option<FsmHints>,
    store: Option<R::Store>,
    assignment: Option<ShardAssignment>,
    offsets: Option<JournalOffsetMap>,
}

impl<R: RecoveryLogReplayer> ShardBootstrap<R> {
    /// Create a bootstrap for the shard described by `config`.
    #[must_use]
    pub fn new(config: &ShardConfig, client: Arc<dyn CoordinationClient>, replayer: R) -> Self {
        Self {
            shard: config.shard.id,
            coordination_root: config.shard.coordination_root.clone(),
            recovery_log_root: config.shard.recovery_log_root.clone(),
            local_dir: config.shard.local_dir(),
            topics: config.topics.clone(),
            client,
            replayer,
            retry: RetryPolicy::from_config(&config.retry),
            metrics: None,
            state: BootstrapState::Unstarted,
            started_at: None,
            tree: None,
            hints: None,
            store: None,
            assignment: None,
            offsets: None,
        }
    }

    /// Record progress into `metrics`, counting coordination retries too.
    #[must_use]
    pub fn with_metrics(mut self, metrics: BootstrapMetrics) -> Self {
        self.retry = self
            .retry
            .with_counter(metrics.coordination_retries.clone());
        self.metrics = Some(metrics);
        self
    }

    /// Replace the retry policy derived from configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = match &self.metrics {
            Some(metrics) => retry.with_counter(metrics.coordination_retries.clone()),
            None => retry,
        };
        self
    }

    #[must_use]
    pub fn state(&self) -> BootstrapState {
        self.state
    }

    #[must_use]
    pub fn shard(&self) -> ShardId {
        self.shard
    }

    /// Coordination tree fetched by [`load_hints`](Self::load_hints).
    #[must_use]
    pub fn tree(&self) -> Option<&Node> {
        self.tree.as_ref()
    }

    #[must_use]
    pub fn hints(&self) -> Option<&FsmHints> {
        self.hints.as_ref()
    }

    /// Replayed store, until it is handed over by [`start`](Self::start).
    #[must_use]
    pub fn store(&self) -> Option<&R::Store> {
        self.store.as_ref()
    }

    #[must_use]
    pub fn assignment(&self) -> Option<&ShardAssignment> {
        self.assignment.as_ref()
    }

    #[must_use]
    pub fn offsets(&self) -> Option<&JournalOffsetMap> {
        self.offsets.as_ref()
    }

    /// Fetch the coordination tree and load this shard's hints from it.
    ///
    /// # Errors
    ///
    /// Fails the bootstrap if the tree cannot be fetched within the retry
    /// budget or the stored hints are malformed.
    pub async fn load_hints(&mut self) -> Result<()> {
        self.check_transition(BootstrapState::HintsLoaded)?;
        self.started_at = Some(Instant::now());
        if let Some(metrics) = &self.metrics {
            metrics.record_attempt();
        }

        let tree = match self.fetch_tree().await {
            Ok(tree) => tree,
            Err(err) => return Err(self.fail(err)),
        };
        let hints = match hints::load_hints(self.shard, &self.recovery_log_root, &tree) {
            Ok(hints) => hints,
            Err(err) => return Err(self.fail(err)),
        };

        info!(
            shard = %self.shard,
            state = %BootstrapState::HintsLoaded,
            log = %hints.log_mark.journal,
            log_offset = hints.log_mark.offset,
            initial = hints.is_initial(),
            tree_leaves = tree.leaf_count(),
            "loaded shard hints"
        );
        self.tree = Some(tree);
        self.hints = Some(hints);
        self.state = BootstrapState::HintsLoaded;
        Ok(())
    }

    /// Rebuild the local store from the recovery log.
    ///
    /// # Errors
    ///
    /// Fails the bootstrap if the replayer fails.
    pub async fn replay_log(&mut self) -> Result<()> {
        let to = BootstrapState::LogReplayed;
        self.check_transition(to)?;

        let replayed = {
            let hints = self.hints.as_ref().ok_or(self.invalid(to))?;
            self.replayer.replay(hints, &self.local_dir).await
        };
        let store = match replayed {
            Ok(store) => store,
            Err(err) => return Err(self.fail(err)),
        };

        info!(
            shard = %self.shard,
            state = %to,
            local_dir = %self.local_dir.display(),
            "replayed recovery log"
        );
        self.store = Some(store);
        self.state = to;
        Ok(())
    }

    /// Resolve the journals this shard owns.
    ///
    /// # Errors
    ///
    /// Fails the bootstrap if the topic partition counts are not mutually
    /// divisible. The failure is static and not retried.
    pub fn assign_partitions(&mut self) -> Result<()> {
        let to = BootstrapState::PartitionsAssigned;
        self.check_transition(to)?;

        let assignment = match ShardAssignment::compute(&self.topics, self.shard) {
            Ok(assignment) => assignment,
            Err(err) => return Err(self.fail(err)),
        };

        info!(
            shard = %self.shard,
            state = %to,
            num_shards = assignment.num_shards(),
            journals = assignment.journals().len(),
            aliased = assignment.is_aliased(),
            "assigned partitions"
        );
        self.assignment = Some(assignment);
        self.state = to;
        Ok(())
    }

    /// Merge local-store and mirrored offsets for the owned journals.
    ///
    /// # Errors
    ///
    /// Fails the bootstrap if either offset source is corrupt.
    pub fn reconcile_offsets(&mut self) -> Result<()> {
        let to = BootstrapState::OffsetsReconciled;
        self.check_transition(to)?;

        let reconciled = {
            let (Some(store), Some(tree), Some(assignment)) =
                (&self.store, &self.tree, &self.assignment)
            else {
                return Err(self.invalid(to));
            };
            offsets::reconcile(store, tree, assignment.journals())
        };
        let offsets = match reconciled {
            Ok(offsets) => offsets,
            Err(err) => return Err(self.fail(err)),
        };

        if let Some(metrics) = &self.metrics {
            metrics.set_reconciled_offsets(offsets.len());
        }
        info!(
            shard = %self.shard,
            state = %to,
            offsets = offsets.len(),
            "reconciled offsets"
        );
        self.offsets = Some(offsets);
        self.state = to;
        Ok(())
    }

    /// Hand the recovered shard to `runner`.
    ///
    /// # Errors
    ///
    /// Fails the bootstrap if the runner refuses the shard.
    pub async fn start<Run>(&mut self, runner: &Run) -> Result<()>
    where
        Run: ShardRunner<R::Store> + ?Sized,
    {
        let to = BootstrapState::Running;
        self.check_transition(to)?;

        let (Some(hints), Some(offsets), Some(assignment), Some(store)) = (
            self.hints.clone(),
            self.offsets.take(),
            self.assignment.clone(),
            self.store.take(),
        ) else {
            return Err(self.invalid(to));
        };
        let offset_count = offsets.len();

        let mut hints_writer =
            HintsWriter::new(self.client.clone(), &self.coordination_root, self.shard)
                .with_retry(self.retry.clone());
        if let Some(metrics) = &self.metrics {
            hints_writer = hints_writer.with_metrics(metrics.clone());
        }

        let recovered = RecoveredShard {
            shard: self.shard,
            hints,
            offsets,
            assignment,
            store,
            hints_writer,
        };
        if let Err(err) = runner.start(recovered).await {
            return Err(self.fail(err));
        }

        let elapsed = self.started_at.map(|t| t.elapsed());
        if let (Some(metrics), Some(elapsed)) = (&self.metrics, elapsed) {
            metrics.record_duration(elapsed.as_secs_f64());
        }
        info!(
            shard = %self.shard,
            state = %to,
            offsets = offset_count,
            elapsed_ms = elapsed.map(|e| u64::try_from(e.as_millis()).unwrap_or(u64::MAX)),
            "shard running"
        );
        self.state = to;
        Ok(())
    }

    /// Run every remaining step and hand the shard to `runner`.
    ///
    /// # Errors
    ///
    /// Returns the first step error; the machine is then `Failed`.
    pub async fn run<Run>(&mut self, runner: &Run) -> Result<()>
    where
        Run: ShardRunner<R::Store> + ?Sized,
    {
        self.load_hints().await?;
        self.replay_log().await?;
        self.assign_partitions()?;
        self.reconcile_offsets()?;
        self.start(runner).await
    }

    /// Fetch the full tree under the coordination root. A root that does not
    /// exist yet is an empty directory.
    async fn fetch_tree(&self) -> std::result::Result<Node, CoordinationError> {
        let client = self.client.as_ref();
        let root = self.coordination_root.as_str();

        match self
            .retry
            .run("get", move || client.get(root, true))
            .await
        {
            Ok(tree) => Ok(tree),
            Err(CoordinationError::NotFound { .. }) => {
                debug!(root, "coordination root not found, using empty tree");
                Ok(Node::dir(root, Vec::new()))
            }
            Err(err) => Err(err),
        }
    }

    fn check_transition(&self, to: BootstrapState) -> Result<()> {
        if self.state.next() == Some(to) {
            Ok(())
        } else {
            Err(self.invalid(to))
        }
    }

    fn invalid(&self, to: BootstrapState) -> BootstrapError {
        BootstrapError::InvalidTransition {
            from: self.state,
            to,
        }
    }

    fn fail(&mut self, err: impl Into<BootstrapError>) -> BootstrapError {
        let err = err.into();
        error!(
            shard = %self.shard,
            state = %self.state,
            error = %err,
            "shard bootstrap failed"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_failure(self.state.as_str());
        }
        self.state = BootstrapState::Failed;
        err
    }
}

impl<R: RecoveryLogReplayer> fmt::Debug for ShardBootstrap<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardBootstrap")
            .field("shard", &self.shard)
            .field("coordination_root", &self.coordination_root)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
