//! Shard cardinality and partition ownership.
//!
//! This module contains the pure mapping from a shard id and a topic set to the
//! journals the shard consumes.
//!
//! # Assignment
//!
//! [`ShardAssignment`] bundles the validated shard count with a shard's owned
//! journals, and is the form consumed by bootstrap.

mod assignment;
mod partition_mapper;

pub use assignment::ShardAssignment;
pub use partition_mapper::{journals_for_shard, num_shards, shards_for_journal};
