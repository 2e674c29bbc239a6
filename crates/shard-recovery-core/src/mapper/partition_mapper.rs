//! Core shard-to-partition mapping logic.
//!
//! Derives the number of shards from topic partition counts and the set of
//! journals each shard consumes.
//!
//! # Ownership Layout
//!
//! With `N = max(partitions)` shards, shard `s` owns partition `s % P` of every
//! topic with `P` partitions. Because every `P` divides `N`, ownership is
//! periodic in `s` with period `N`, and partition `p` of a `P`-partition topic is
//! owned by shards `p, p+P, p+2P, ...` below `N`.
//!
//! # Example
//!
//! With topics `foo:1`, `bar:4`, `baz:16` (16 shards):
//! - Shard 5 → `foo/part-000`, `bar/part-001`, `baz/part-005`
//! - Shard 14 → `foo/part-000`, `bar/part-002`, `baz/part-014`

use std::collections::HashMap;

use crate::error::{ConfigError, ConfigResult};
use crate::journal::JournalName;
use crate::shard::ShardId;
use crate::topic::TopicDescription;

/// Compute the number of shards required to consume `topics`.
///
/// The shard count is the largest partition count. Partition counts are
/// required to evenly divide it rather than falling back to a least common
/// multiple, so `{3, 4, 16}` is rejected.
///
/// # Errors
///
/// Returns an error if:
/// - `topics` is empty
/// - any topic has zero partitions
/// - any partition count does not divide the largest one
pub fn num_shards(topics: &[TopicDescription]) -> ConfigResult<u32> {
    if topics.is_empty() {
        return Err(ConfigError::NoTopics);
    }

    if let Some(topic) = topics.iter().find(|t| t.partitions == 0) {
        return Err(ConfigError::ZeroPartitions {
            topic: topic.name.clone(),
        });
    }

    let count = topics.iter().map(|t| t.partitions).max().unwrap_or(1);

    if topics.iter().any(|t| count % t.partitions != 0) {
        return Err(ConfigError::PartitionsNotMultiples);
    }
    Ok(count)
}

/// Map each journal consumed by `shard` to its topic.
///
/// Topics with zero partitions are skipped; [`num_shards`] rejects them.
#[must_use]
pub fn journals_for_shard(
    topics: &[TopicDescription],
    shard: ShardId,
) -> HashMap<JournalName, TopicDescription> {
    topics
        .iter()
        .filter(|topic| topic.partitions > 0)
        .map(|topic| {
            let partition = shard.get() % topic.partitions;
            (
                JournalName::for_partition(&topic.name, partition),
                topic.clone(),
            )
        })
        .collect()
}

/// List the shards in `[0, num_shards)` that consume `journal`.
///
/// Returns an empty list if the journal does not name a partition of one of
/// `topics`, or if the topic set is invalid.
#[must_use]
pub fn shards_for_journal(topics: &[TopicDescription], journal: &JournalName) -> Vec<ShardId> {
    let Ok(count) = num_shards(topics) else {
        return Vec::new();
    };
    let Some((name, partition)) = journal.partition() else {
        return Vec::new();
    };
    let Some(topic) = topics.iter().find(|t| t.name == name) else {
        return Vec::new();
    };
    if partition >= topic.partitions {
        return Vec::new();
    }

    (partition..count)
        .step_by(topic.partitions as usize)
        .map(ShardId)
        .collect()
}
