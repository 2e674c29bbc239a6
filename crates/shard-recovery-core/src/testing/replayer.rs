//! Recovery log replayer for tests.
//!
//! [`MemoryReplayer`] replays nothing: it records each request and hands out a
//! prepared in-memory store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::bootstrap::RecoveryLogReplayer;
use crate::error::ReplayError;
use crate::hints::FsmHints;
use crate::store::MemoryStore;

/// A replay request received by a test replayer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayCall {
    pub hints: FsmHints,
    pub local_dir: PathBuf,
}

/// Replayer returning a shared, pre-populated in-memory store.
#[derive(Debug, Default)]
pub struct MemoryReplayer {
    store: Arc<MemoryStore>,
    failure: Option<String>,
    calls: Mutex<Vec<ReplayCall>>,
}

impl MemoryReplayer {
    #[must_use]
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            ..Self::default()
        }
    }

    /// A replayer whose every replay fails with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// The store handed out by every replay.
    #[must_use]
    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    #[must_use]
    pub fn calls(&self) -> Vec<ReplayCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl RecoveryLogReplayer for MemoryReplayer {
    type Store = Arc<MemoryStore>;

    async fn replay(
        &self,
        hints: &FsmHints,
        local_dir: &Path,
    ) -> Result<Self::Store, ReplayError> {
        self.calls.lock().push(ReplayCall {
            hints: hints.clone(),
            local_dir: local_dir.to_path_buf(),
        });
        match &self.failure {
            Some(message) => Err(ReplayError {
                journal: hints.log_mark.journal.to_string(),
                message: message.clone(),
            }),
            None => Ok(Arc::clone(&self.store)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::JournalName;
    use crate::store::LocalStore;

    #[tokio::test]
    async fn test_memory_replayer_shares_store() {
        let store = Arc::new(MemoryStore::new());
        store.put(b"k", b"v").unwrap();
        let replayer = MemoryReplayer::new(store);

        let hints = FsmHints::initial(JournalName::from("logs/shard-000"));
        let replayed = replayer.replay(&hints, Path::new("/tmp/x")).await.unwrap();
        assert_eq!(replayed.get(b"k").unwrap(), Some(b"v".to_vec()));

        let calls = replayer.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].local_dir, PathBuf::from("/tmp/x"));
    }

    #[tokio::test]
    async fn test_failing_replayer() {
        let replayer = MemoryReplayer::failing("log truncated");
        let hints = FsmHints::initial(JournalName::from("logs/shard-000"));

        let err = replayer.replay(&hints, Path::new("/tmp/x")).await.unwrap_err();
        assert_eq!(err.journal, "logs/shard-000");
        assert_eq!(err.message, "log truncated");
    }
}
