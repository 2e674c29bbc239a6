//! Loading, persisting and merging journal read offsets.
//!
//! Two copies of a shard's offsets exist: the authoritative one in the local
//! store, written atomically with the state it describes, and a mirror in the
//! coordination tree, written asynchronously. After a crash or migration the
//! two are merged, with the local store winning every conflict.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::coordination::{join_key, relative_to, CoordinationClient, Node};
use crate::error::{OffsetError, OffsetResult};
use crate::journal::{JournalName, JournalOffsetMap};
use crate::store::{LocalStore, StoreBatch};
use crate::topic::TopicDescription;

use super::mark::{encode_offset, parse_offset, MarkKey};

/// Directory of mirrored offsets below a coordination root.
pub const OFFSETS_DIR: &str = "offsets";

/// Coordination path of the offsets directory under `root`.
#[must_use]
pub fn offsets_path(root: &str) -> String {
    join_key(root, OFFSETS_DIR)
}

/// Load mirrored offsets from a coordination tree snapshot rooted at `tree.key`.
///
/// Every leaf below `<root>/offsets` contributes one journal, named by its key
/// relative to that directory. A tree without offsets yields an empty map.
///
/// # Errors
///
/// Returns [`OffsetError::ParseOffset`] if any leaf is not a hexadecimal offset.
pub fn load_offsets_from_tree(tree: &Node) -> OffsetResult<JournalOffsetMap> {
    let root = offsets_path(&tree.key);
    let mut offsets = JournalOffsetMap::new();

    let Some(dir) = tree.find(&root) else {
        return Ok(offsets);
    };

    dir.for_each_leaf(&mut |leaf: &Node| -> OffsetResult<()> {
        let Some(name) = relative_to(&root, &leaf.key).filter(|n| !n.is_empty()) else {
            return Ok(());
        };
        offsets.insert(JournalName::from(name), parse_offset(&leaf.value)?);
        Ok(())
    })?;
    Ok(offsets)
}

/// Stage `offsets` into `batch` under their mark keys.
pub fn store_offsets(batch: &mut StoreBatch, offsets: &JournalOffsetMap) {
    for (journal, offset) in offsets {
        batch.put(
            MarkKey::new(journal.clone()).encode().to_vec(),
            encode_offset(*offset).into_bytes(),
        );
    }
}

/// Empty `offsets` in place, keeping its allocation for the next transaction.
pub fn clear_offsets(offsets: &mut JournalOffsetMap) {
    offsets.clear();
}

/// Load every persisted offset from the local store.
///
/// # Errors
///
/// Returns an error if a mark key is malformed (wrong component count or a
/// non-string journal), if a value is not a hexadecimal offset, or if the
/// store fails.
pub fn load_offsets_from_db(store: &dyn LocalStore) -> OffsetResult<JournalOffsetMap> {
    let mut offsets = JournalOffsetMap::new();
    for (key, value) in store.scan_prefix(&MarkKey::prefix())? {
        let mark = MarkKey::decode(&key)?;
        let value = std::str::from_utf8(&value).map_err(|_| OffsetError::ValueEncoding {
            journal: mark.journal.to_string(),
        })?;
        offsets.insert(mark.journal, parse_offset(value)?);
    }
    Ok(offsets)
}

/// Merge local-store offsets with mirrored coordination offsets.
///
/// The result holds every journal of either map. Where both hold a journal the
/// local-store value is kept, whether or not it is the larger one: it reflects
/// the last write this shard applied, while the mirror may lag (asynchronous
/// mirroring) or lead (a local commit lost to a crash after mirroring).
#[must_use]
pub fn merge_offsets(db: &JournalOffsetMap, tree: &JournalOffsetMap) -> JournalOffsetMap {
    let mut merged = tree.clone();
    for (journal, offset) in db {
        if let Some(mirrored) = merged.insert(journal.clone(), *offset) {
            if mirrored != *offset {
                debug!(
                    journal = %journal,
                    db_offset = offset,
                    mirrored_offset = mirrored,
                    "local store offset differs from mirror, using local store"
                );
            }
        }
    }
    merged
}

/// Reconcile both offset sources for the journals a shard owns.
///
/// # Errors
///
/// Returns an error if either source fails to load.
pub fn reconcile(
    store: &dyn LocalStore,
    tree: &Node,
    owned: &HashMap<JournalName, TopicDescription>,
) -> OffsetResult<JournalOffsetMap> {
    let db = load_offsets_from_db(store)?;
    let mirrored = load_offsets_from_tree(tree)?;

    let mut merged = merge_offsets(&db, &mirrored);
    merged.retain(|journal, _| owned.contains_key(journal));

    info!(
        db_offsets = db.len(),
        mirrored_offsets = mirrored.len(),
        reconciled = merged.len(),
        owned = owned.len(),
        "reconciled journal offsets"
    );
    Ok(merged)
}

/// Mirror `offsets` into the coordination tree under `<root>/offsets`.
///
/// # Errors
///
/// Returns the first coordination error; earlier writes are not rolled back.
pub async fn mirror_offsets(
    client: &dyn CoordinationClient,
    root: &str,
    offsets: &JournalOffsetMap,
) -> OffsetResult<()> {
    let dir = offsets_path(root);
    let mut journals: Vec<&JournalName> = offsets.keys().collect();
    journals.sort();

    for journal in journals {
        let key = join_key(&dir, journal.as_str());
        client.set(&key, &encode_offset(offsets[journal])).await?;
    }
    debug!(root, count = offsets.len(), "mirrored offsets");
    Ok(())
}
