//! Coordination service contract.
//!
//! Shards exchange hints and mirrored offsets through a hierarchical key/value
//! service. The core only needs three capabilities, expressed by
//! [`CoordinationClient`] and injected into the components that use them:
//!
//! - `get` - fetch a key, optionally with its full subtree
//! - `set` - write a leaf value, last writer wins
//! - `list` - list the direct children of a directory

mod memory;
mod node;

use async_trait::async_trait;

use crate::error::CoordinationResult;

pub use memory::MemoryCoordinator;
pub use node::{join_key, normalize_key, relative_to, Node};

/// Read/write access to a coordination tree.
#[async_trait]
pub trait CoordinationClient: Send + Sync {
    /// Fetch the node at `key`. With `recursive`, directories include their
    /// full subtree; otherwise only direct children, without their children.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinationError::NotFound`](crate::error::CoordinationError::NotFound)
    /// if the key does not exist.
    async fn get(&self, key: &str, recursive: bool) -> CoordinationResult<Node>;

    /// Write `value` at `key`, replacing any prior value.
    async fn set(&self, key: &str, value: &str) -> CoordinationResult<()>;

    /// Full keys of the direct children of the directory at `key`.
    async fn list(&self, key: &str) -> CoordinationResult<Vec<String>>;
}
