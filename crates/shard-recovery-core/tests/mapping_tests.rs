//! Integration tests for shard-to-journal mapping.
//!
//! Tests the shard count derivation and that the forward and reverse
//! ownership lookups agree across whole topic sets.

use std::collections::HashSet;

use shard_recovery_core::error::ConfigError;
use shard_recovery_core::{
    journals_for_shard, num_shards, shards_for_journal, JournalName, ShardAssignment, ShardId,
    TopicDescription,
};

fn topics(counts: &[(&str, u32)]) -> Vec<TopicDescription> {
    counts
        .iter()
        .map(|(name, partitions)| TopicDescription::new(*name, *partitions))
        .collect()
}

fn sorted_names(shard: u32, topics: &[TopicDescription]) -> Vec<String> {
    let mut names: Vec<String> = journals_for_shard(topics, ShardId(shard))
        .into_keys()
        .map(JournalName::into_inner)
        .collect();
    names.sort();
    names
}

/// Test that the shard count is the largest partition count.
#[test]
fn test_num_shards_largest_count() {
    assert_eq!(
        num_shards(&topics(&[("foo", 1), ("bar", 4), ("baz", 16)])).unwrap(),
        16
    );
    assert_eq!(
        num_shards(&topics(&[("foo", 2), ("bar", 4), ("baz", 16)])).unwrap(),
        16
    );
}

/// Test that counts which do not divide the largest one are rejected.
#[test]
fn test_num_shards_not_multiples() {
    let err = num_shards(&topics(&[("foo", 3), ("bar", 4), ("baz", 16)])).unwrap_err();
    assert!(matches!(err, ConfigError::PartitionsNotMultiples));
    assert_eq!(
        err.to_string(),
        "topic partitions must be multiples of each other"
    );
}

/// Test the ownership of shards 5, 14 and 7 over `foo:1`, `bar:4`, `baz:16`.
#[test]
fn test_journals_for_shard_examples() {
    let topics = topics(&[("foo", 1), ("bar", 4), ("baz", 16)]);

    assert_eq!(
        sorted_names(5, &topics),
        vec!["bar/part-001", "baz/part-005", "foo/part-000"]
    );
    assert_eq!(
        sorted_names(14, &topics),
        vec!["bar/part-002", "baz/part-014", "foo/part-000"]
    );
    assert_eq!(
        sorted_names(7, &topics),
        vec!["bar/part-003", "baz/part-007", "foo/part-000"]
    );
}

/// Test that each mapped journal carries its topic description.
#[test]
fn test_journals_carry_topic() {
    let topics = topics(&[("foo", 1), ("bar", 4), ("baz", 16)]);
    let journals = journals_for_shard(&topics, ShardId(5));

    assert_eq!(journals[&JournalName::from("bar/part-001")], topics[1]);
    assert_eq!(journals[&JournalName::from("baz/part-005")].partitions, 16);
}

/// Test that every journal is owned by exactly the shards listed for it.
#[test]
fn test_forward_and_reverse_agree() {
    let topics = topics(&[("foo", 1), ("bar", 4), ("baz", 16)]);
    let count = num_shards(&topics).unwrap();

    for topic in &topics {
        for partition in 0..topic.partitions {
            let journal = JournalName::for_partition(&topic.name, partition);
            let owners: HashSet<ShardId> =
                shards_for_journal(&topics, &journal).into_iter().collect();

            let expected: HashSet<ShardId> = (0..count)
                .map(ShardId)
                .filter(|shard| journals_for_shard(&topics, *shard).contains_key(&journal))
                .collect();
            assert_eq!(owners, expected, "owners of {journal}");
            assert_eq!(owners.len() as u32, count / topic.partitions);
        }
    }
}

/// Test that unknown or out-of-range journals have no owners.
#[test]
fn test_shards_for_unknown_journal() {
    let topics = topics(&[("foo", 1), ("bar", 4)]);

    assert!(shards_for_journal(&topics, &JournalName::from("qux/part-000")).is_empty());
    assert!(shards_for_journal(&topics, &JournalName::from("bar/part-004")).is_empty());
    assert!(shards_for_journal(&topics, &JournalName::from("bar")).is_empty());
    assert_eq!(
        shards_for_journal(&topics, &JournalName::from("bar/part-002")),
        vec![ShardId(2)]
    );
}

/// Test that a shard beyond the shard count aliases a lower shard.
#[test]
fn test_aliased_assignment() {
    let topics = topics(&[("foo", 1), ("bar", 4), ("baz", 16)]);

    let aliased = ShardAssignment::compute(&topics, ShardId(21)).unwrap();
    let base = ShardAssignment::compute(&topics, ShardId(5)).unwrap();

    assert!(aliased.is_aliased());
    assert!(!base.is_aliased());
    assert_eq!(aliased.journals(), base.journals());
}

/// Test that assignment validates the topic set.
#[test]
fn test_assignment_rejects_invalid_topics() {
    assert!(matches!(
        ShardAssignment::compute(&[], ShardId(0)),
        Err(ConfigError::NoTopics)
    ));
    assert!(matches!(
        ShardAssignment::compute(&topics(&[("foo", 0)]), ShardId(0)),
        Err(ConfigError::ZeroPartitions { ref topic }) if topic == "foo"
    ));
}
