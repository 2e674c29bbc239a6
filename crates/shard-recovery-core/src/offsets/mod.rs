//! Journal offset reconciliation.
//!
//! Offsets live in two places: the shard's local store under
//! `("_mark", <journal>)` keys, and a mirror in the coordination tree under
//! `<root>/offsets/<journal>`. Both encode offsets as sign-prefixed
//! lowercase hexadecimal.

mod mark;
mod reconciler;

pub use mark::{encode_offset, parse_offset, MarkKey, MARK_TAG};
pub use reconciler::{
    clear_offsets, load_offsets_from_db, load_offsets_from_tree, merge_offsets, mirror_offsets,
    offsets_path, reconcile, store_offsets, OFFSETS_DIR,
};
