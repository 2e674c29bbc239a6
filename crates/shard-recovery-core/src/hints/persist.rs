//! Loading and storing hints in the coordination tree.

use std::fmt;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::coordination::{join_key, CoordinationClient, Node};
use crate::error::{HintsError, HintsResult};
use crate::journal::JournalName;
use crate::metrics::BootstrapMetrics;
use crate::retry::RetryPolicy;
use crate::shard::ShardId;

use super::fsm::FsmHints;

/// Directory of per-shard hints below a coordination root.
pub const HINTS_DIR: &str = "hints";

/// Coordination path of `shard`'s hints under `root`.
#[must_use]
pub fn hints_path(root: &str, shard: ShardId) -> String {
    join_key(&join_key(root, HINTS_DIR), &shard.name())
}

/// Load `shard`'s hints from a coordination tree snapshot rooted at `tree.key`.
///
/// A shard without stored hints gets initial hints replaying its recovery log,
/// `recovery_log_root` followed by the shard name, from the beginning.
///
/// # Errors
///
/// Returns [`HintsError::Decode`] if stored hints are not valid hints JSON.
pub fn load_hints(shard: ShardId, recovery_log_root: &str, tree: &Node) -> HintsResult<FsmHints> {
    let path = hints_path(&tree.key, shard);

    match tree.find(&path) {
        Some(node) => {
            let hints: FsmHints = serde_json::from_str(&node.value).map_err(HintsError::Decode)?;
            debug!(%shard, path, log = %hints.log_mark.journal, "loaded stored hints");
            Ok(hints)
        }
        None => {
            let log = JournalName::new(format!("{recovery_log_root}{}", shard.name()));
            info!(%shard, log = %log, "no stored hints, starting from initial hints");
            Ok(FsmHints::initial(log))
        }
    }
}

/// Encode `hints` and write them at `path`, replacing any prior value.
///
/// # Errors
///
/// Returns an error if encoding fails or the coordination service rejects
/// or fails the write.
pub async fn store_hints(
    client: &dyn CoordinationClient,
    hints: &FsmHints,
    path: &str,
) -> HintsResult<()> {
    let encoded = serde_json::to_string(hints).map_err(HintsError::Encode)?;
    client
        .set(path, &encoded)
        .await
        .map_err(|source| HintsError::Store {
            path: path.to_string(),
            source,
        })?;
    debug!(path, bytes = encoded.len(), "stored hints");
    Ok(())
}

/// Store hints on a background task.
///
/// The returned handle resolves once the write is accepted or rejected; the
/// caller may drop it to fire and forget.
pub fn spawn_store_hints(
    client: Arc<dyn CoordinationClient>,
    hints: FsmHints,
    path: String,
) -> JoinHandle<HintsResult<()>> {
    tokio::spawn(async move { store_hints(client.as_ref(), &hints, &path).await })
}

/// Persists a running shard's hints at its fixed coordination path.
///
/// Writes are retried on transient coordination errors according to the
/// writer's [`RetryPolicy`]; a fresh writer makes a single attempt.
#[derive(Clone)]
pub struct HintsWriter {
    client: Arc<dyn CoordinationClient>,
    path: String,
    retry: RetryPolicy,
    metrics: Option<BootstrapMetrics>,
}

impl HintsWriter {
    #[must_use]
    pub fn new(client: Arc<dyn CoordinationClient>, root: &str, shard: ShardId) -> Self {
        Self {
            client,
            path: hints_path(root, shard),
            retry: RetryPolicy::no_retry(),
            metrics: None,
        }
    }

    /// Retry transient write failures under `retry`.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Count accepted writes into `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: BootstrapMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Store `hints`, waiting for the coordination service.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails, the write fails permanently, or
    /// the retry budget runs out.
    pub async fn store(&self, hints: &FsmHints) -> HintsResult<()> {
        let encoded = serde_json::to_string(hints).map_err(HintsError::Encode)?;
        let client = self.client.as_ref();
        let path = self.path.as_str();
        let value = encoded.as_str();

        self.retry
            .run("set", move || client.set(path, value))
            .await
            .map_err(|source| HintsError::Store {
                path: self.path.clone(),
                source,
            })?;
        debug!(path, bytes = encoded.len(), "stored hints");

        if let Some(metrics) = &self.metrics {
            metrics.record_hints_stored();
        }
        Ok(())
    }

    /// Store `hints` on a background task.
    pub fn spawn_store(&self, hints: FsmHints) -> JoinHandle<HintsResult<()>> {
        let writer = self.clone();
        tokio::spawn(async move {
            let result = writer.store(&hints).await;
            if let Err(err) = &result {
                warn!(path = %writer.path, error = %err, "background hints write failed");
            }
            result
        })
    }
}

impl fmt::Debug for HintsWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HintsWriter")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
