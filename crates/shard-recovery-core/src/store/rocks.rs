//! RocksDB-backed local store.
//!
//! RocksDB holds an exclusive lock on its directory for as long as the handle
//! is open, so a second process (or handle) opening the same shard directory
//! fails fast with [`StoreError::Locked`].

use std::path::{Path, PathBuf};

use rocksdb::{Direction, ErrorKind, IteratorMode, Options, WriteBatch, DB};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};

use super::{BatchOp, LocalStore, StoreBatch};

/// A [`LocalStore`] over a RocksDB database directory.
pub struct RocksStore {
    db: DB,
    path: PathBuf,
}

impl std::fmt::Debug for RocksStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksStore").field("path", &self.path).finish()
    }
}

impl RocksStore {
    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Locked`] if the directory is already open, or the
    /// underlying RocksDB error otherwise.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut options = Options::default();
        options.create_if_missing(true);

        let db = DB::open(&options, &path).map_err(|err| classify_open_error(&path, err))?;
        info!(path = %path.display(), "opened local store");
        Ok(Self { db, path })
    }

    /// Directory backing the database.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn classify_open_error(path: &Path, err: rocksdb::Error) -> StoreError {
    let message = err.to_string();
    if is_lock_conflict(err.kind(), &message) {
        StoreError::Locked {
            path: path.to_path_buf(),
            message,
        }
    } else {
        StoreError::RocksDb(err)
    }
}

/// Whether an open failure is RocksDB refusing the directory's `LOCK` file.
///
/// Only I/O errors qualify; corruption reports such as "block checksum
/// mismatch" are left alone.
fn is_lock_conflict(kind: ErrorKind, message: &str) -> bool {
    kind == ErrorKind::IOError
        && (message.contains("LOCK:")
            || message.contains("lock file")
            || message.contains("lock hold"))
}

impl LocalStore for RocksStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.db.get(key)?)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        Ok(self.db.put(key, value)?)
    }

    fn delete(&self, key: &[u8]) -> StoreResult<()> {
        Ok(self.db.delete(key)?)
    }

    fn write(&self, batch: StoreBatch) -> StoreResult<()> {
        let mut wb = WriteBatch::default();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { key, value } => wb.put(key, value),
                BatchOp::Delete { key } => wb.delete(key),
            }
        }
        debug!(ops = wb.len(), "writing batch to local store");
        Ok(self.db.write(wb)?)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix, Direction::Forward));

        let mut entries = Vec::new();
        for entry in iter {
            let (key, value) = entry?;
            if !key.starts_with(prefix) {
                break;
            }
            entries.push((key.into_vec(), value.into_vec()));
        }
        Ok(entries)
    }
}
