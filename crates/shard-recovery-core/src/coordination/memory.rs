//! In-process coordination tree.

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::trace;

use crate::error::{CoordinationError, CoordinationResult};

use super::node::{normalize_key, relative_to};
use super::{CoordinationClient, Node};

/// A coordination tree held in memory.
///
/// Only leaves are stored; directories exist implicitly while they have a
/// leaf below them.
#[derive(Debug, Default)]
pub struct MemoryCoordinator {
    leaves: DashMap<String, String>,
}

impl MemoryCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate from every leaf of a tree snapshot.
    #[must_use]
    pub fn from_tree(tree: &Node) -> Self {
        let coordinator = Self::new();
        coordinator.insert_leaves(tree);
        coordinator
    }

    fn insert_leaves(&self, node: &Node) {
        if node.dir {
            for child in &node.nodes {
                self.insert_leaves(child);
            }
        } else {
            self.leaves.insert(node.key.clone(), node.value.clone());
        }
    }

    /// Current value of a leaf.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<String> {
        self.leaves
            .get(normalize_key(key))
            .map(|entry| entry.value().clone())
    }

    /// Number of stored leaves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Sorted `(key, value)` pairs of every leaf below `dir`.
    fn leaves_below(&self, dir: &str) -> Vec<(String, String)> {
        let mut leaves: Vec<(String, String)> = self
            .leaves
            .iter()
            .filter(|entry| {
                relative_to(dir, entry.key()).is_some_and(|rest| !rest.is_empty())
            })
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        leaves.sort();
        leaves
    }

    fn has_leaf_ancestor(&self, key: &str) -> bool {
        let mut prefix = key;
        while let Some(idx) = prefix.rfind('/') {
            prefix = &prefix[..idx];
            if !prefix.is_empty() && self.leaves.contains_key(prefix) {
                return true;
            }
        }
        false
    }

    fn is_dir(&self, key: &str) -> bool {
        self.leaves
            .iter()
            .any(|entry| relative_to(key, entry.key()).is_some_and(|rest| !rest.is_empty()))
    }
}

#[async_trait]
impl CoordinationClient for MemoryCoordinator {
    async fn get(&self, key: &str, recursive: bool) -> CoordinationResult<Node> {
        let key = normalize_key(key);
        if let Some(value) = self.value(key) {
            return Ok(Node::leaf(key, value));
        }

        let leaves = self.leaves_below(key);
        if leaves.is_empty() {
            return Err(CoordinationError::NotFound {
                key: key.to_string(),
            });
        }

        let mut root = Node::dir(key, Vec::new());
        for (leaf_key, value) in &leaves {
            root.insert_leaf(leaf_key, value.as_str());
        }
        if !recursive {
            for child in &mut root.nodes {
                if child.dir {
                    child.nodes.clear();
                }
            }
        }
        trace!(key, leaves = leaves.len(), recursive, "coordination get");
        Ok(root)
    }

    async fn set(&self, key: &str, value: &str) -> CoordinationResult<()> {
        let key = normalize_key(key);
        if self.is_dir(key) {
            return Err(CoordinationError::Rejected {
                key: key.to_string(),
                message: "key is a directory".to_string(),
            });
        }
        if self.has_leaf_ancestor(key) {
            return Err(CoordinationError::Rejected {
                key: key.to_string(),
                message: "parent key is not a directory".to_string(),
            });
        }
        trace!(key, "coordination set");
        self.leaves.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn list(&self, key: &str) -> CoordinationResult<Vec<String>> {
        let node = self.get(key, false).await?;
        if !node.dir {
            return Err(CoordinationError::Rejected {
                key: node.key,
                message: "key is not a directory".to_string(),
            });
        }
        Ok(node.nodes.into_iter().map(|n| n.key).collect())
    }
}
