//! Resolved partition ownership for a single shard.

use std::collections::HashMap;

use crate::error::ConfigResult;
use crate::journal::JournalName;
use crate::shard::ShardId;
use crate::topic::TopicDescription;

use super::{journals_for_shard, num_shards};

/// The journals a shard consumes, resolved against a validated topic set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardAssignment {
    shard: ShardId,
    num_shards: u32,
    journals: HashMap<JournalName, TopicDescription>,
}

impl ShardAssignment {
    /// Validate `topics` and compute the journals owned by `shard`.
    ///
    /// # Errors
    ///
    /// Returns an error if the topic partition counts are not mutually divisible.
    pub fn compute(topics: &[TopicDescription], shard: ShardId) -> ConfigResult<Self> {
        let num_shards = num_shards(topics)?;
        Ok(Self {
            shard,
            num_shards,
            journals: journals_for_shard(topics, shard),
        })
    }

    #[must_use]
    pub fn shard(&self) -> ShardId {
        self.shard
    }

    /// Total number of shards for the topic set.
    #[must_use]
    pub fn num_shards(&self) -> u32 {
        self.num_shards
    }

    /// Owned journals and the topic each belongs to.
    #[must_use]
    pub fn journals(&self) -> &HashMap<JournalName, TopicDescription> {
        &self.journals
    }

    #[must_use]
    pub fn owns(&self, journal: &str) -> bool {
        self.journals.contains_key(journal)
    }

    /// Owned journal names in lexicographic order.
    #[must_use]
    pub fn sorted_journals(&self) -> Vec<&JournalName> {
        let mut names: Vec<&JournalName> = self.journals.keys().collect();
        names.sort();
        names
    }

    /// Whether the shard id lies outside `[0, num_shards)`.
    ///
    /// Such a shard duplicates the ownership of `shard % num_shards`.
    #[must_use]
    pub fn is_aliased(&self) -> bool {
        self.shard.get() >= self.num_shards
    }
}
