//! Mock coordination service for integration testing.
//!
//! A [`MemoryCoordinator`] that:
//! - Records every request received
//! - Fails queued requests with injected errors before serving them

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::coordination::{CoordinationClient, MemoryCoordinator, Node};
use crate::error::{CoordinationError, CoordinationResult};

/// Kind of coordination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinationOp {
    Get { recursive: bool },
    Set,
    List,
}

/// A recorded coordination request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinationCall {
    pub op: CoordinationOp,
    pub key: String,
    /// Value written, for `Set`.
    pub value: Option<String>,
    /// Whether an injected failure answered the request.
    pub failed: bool,
}

/// Mock coordination service for testing.
#[derive(Debug, Default)]
pub struct MockCoordinator {
    inner: MemoryCoordinator,
    call_log: Arc<RwLock<Vec<CoordinationCall>>>,
    failures: Mutex<VecDeque<CoordinationError>>,
}

impl MockCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock serving every leaf of `tree`.
    #[must_use]
    pub fn with_tree(tree: &Node) -> Self {
        Self {
            inner: MemoryCoordinator::from_tree(tree),
            ..Self::default()
        }
    }

    /// The underlying tree, bypassing call recording and failure injection.
    #[must_use]
    pub fn inner(&self) -> &MemoryCoordinator {
        &self.inner
    }

    /// Fail the next request with `err`. Queued failures are used in order.
    pub async fn push_failure(&self, err: CoordinationError) {
        self.failures.lock().await.push_back(err);
    }

    /// Fail the next `count` requests as unavailable.
    pub async fn fail_next(&self, count: usize) {
        let mut failures = self.failures.lock().await;
        for attempt in 0..count {
            failures.push_back(CoordinationError::Unavailable {
                message: format!("injected failure {}", attempt + 1),
            });
        }
    }

    /// Get all recorded calls.
    pub async fn get_calls(&self) -> Vec<CoordinationCall> {
        self.call_log.read().await.clone()
    }

    /// Get recorded `set` calls.
    pub async fn get_set_calls(&self) -> Vec<CoordinationCall> {
        self.call_log
            .read()
            .await
            .iter()
            .filter(|call| call.op == CoordinationOp::Set)
            .cloned()
            .collect()
    }

    /// Clear all recorded calls.
    pub async fn clear_calls(&self) {
        self.call_log.write().await.clear();
    }

    /// Record a call and return the injected failure due for it, if any.
    async fn intercept(
        &self,
        op: CoordinationOp,
        key: &str,
        value: Option<&str>,
    ) -> CoordinationResult<()> {
        let failure = self.failures.lock().await.pop_front();
        self.call_log.write().await.push(CoordinationCall {
            op,
            key: key.to_string(),
            value: value.map(str::to_string),
            failed: failure.is_some(),
        });
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CoordinationClient for MockCoordinator {
    async fn get(&self, key: &str, recursive: bool) -> CoordinationResult<Node> {
        self.intercept(CoordinationOp::Get { recursive }, key, None)
            .await?;
        self.inner.get(key, recursive).await
    }

    async fn set(&self, key: &str, value: &str) -> CoordinationResult<()> {
        self.intercept(CoordinationOp::Set, key, Some(value)).await?;
        self.inner.set(key, value).await
    }

    async fn list(&self, key: &str) -> CoordinationResult<Vec<String>> {
        self.intercept(CoordinationOp::List, key, None).await?;
        self.inner.list(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::tree_fixture;

    #[tokio::test]
    async fn test_records_calls() {
        let mock = MockCoordinator::with_tree(&tree_fixture());

        mock.get("/foo", true).await.unwrap();
        mock.set("/foo/hints/shard-001", "{}").await.unwrap();
        let children = mock.list("/foo/offsets").await.unwrap();
        assert_eq!(
            children,
            vec!["/foo/offsets/journal", "/foo/offsets/other-journal"]
        );

        let calls = mock.get_calls().await;
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].op, CoordinationOp::Get { recursive: true });
        assert_eq!(calls[1].value.as_deref(), Some("{}"));
        assert_eq!(mock.get_set_calls().await.len(), 1);

        mock.clear_calls().await;
        assert!(mock.get_calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let mock = MockCoordinator::with_tree(&tree_fixture());
        mock.fail_next(2).await;

        assert!(mock.get("/foo", true).await.unwrap_err().is_transient());
        assert!(mock.set("/foo/x", "1").await.is_err());
        assert!(mock.get("/foo", true).await.is_ok());

        // Failed writes are not applied.
        assert!(mock.inner().value("/foo/x").is_none());

        let calls = mock.get_calls().await;
        assert_eq!(
            calls.iter().map(|c| c.failed).collect::<Vec<_>>(),
            vec![true, true, false]
        );
    }

    #[tokio::test]
    async fn test_push_failure() {
        let mock = MockCoordinator::new();
        mock.push_failure(CoordinationError::Rejected {
            key: "/a".to_string(),
            message: "denied".to_string(),
        })
        .await;

        assert!(matches!(
            mock.set("/a", "1").await,
            Err(CoordinationError::Rejected { .. })
        ));
        mock.set("/a", "1").await.unwrap();
        assert_eq!(mock.inner().value("/a").as_deref(), Some("1"));
    }
}
