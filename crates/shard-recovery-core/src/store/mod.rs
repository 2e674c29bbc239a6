//! Local durable store contract.
//!
//! Shards keep their state in an embedded ordered key/value store. The core
//! only needs point reads and writes, prefix scans and atomic batches, which
//! [`LocalStore`] captures. [`RocksStore`] is the production implementation;
//! [`MemoryStore`] is an ordered in-memory equivalent.

mod memory;
mod rocks;
mod tuple;

use crate::error::StoreResult;

pub use memory::MemoryStore;
pub use rocks::RocksStore;
pub use tuple::{Element, Tuple};

/// Ordered key/value store used for shard state.
pub trait LocalStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()>;

    fn delete(&self, key: &[u8]) -> StoreResult<()>;

    /// Apply every operation of `batch` atomically.
    fn write(&self, batch: StoreBatch) -> StoreResult<()>;

    /// All entries whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>>;
}

/// A single staged write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Writes staged for atomic application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreBatch {
    ops: Vec<BatchOp>,
}

impl StoreBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Put {
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Delete { key: key.into() });
    }

    /// Number of staged operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BatchOp> {
        self.ops.iter()
    }

    #[must_use]
    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

impl<S: LocalStore + ?Sized> LocalStore for std::sync::Arc<S> {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        (**self).put(key, value)
    }

    fn delete(&self, key: &[u8]) -> StoreResult<()> {
        (**self).delete(key)
    }

    fn write(&self, batch: StoreBatch) -> StoreResult<()> {
        (**self).write(batch)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        (**self).scan_prefix(prefix)
    }
}
