//! Shared test data.

use std::collections::BTreeMap;

use crate::coordination::Node;
use crate::hints::{Fnode, FsmHints, RecorderRange};
use crate::journal::Mark;
use crate::topic::TopicDescription;

/// Hints stored for `shard-012` in [`tree_fixture`].
#[must_use]
pub fn hints_fixture() -> FsmHints {
    FsmHints {
        log_mark: Mark::new("some/recovery/logs/shard-012", 1234),
        first_checksum: 1_212_123,
        first_seq_no: 45_645,
        recorders: vec![RecorderRange {
            id: 123,
            last_seq_no: 456,
        }],
        skip_writes: vec![Fnode(42), Fnode(46)],
        properties: BTreeMap::from([("foo".to_string(), "bar".to_string())]),
    }
}

/// Coordination tree rooted at `/foo` with:
///
/// - valid hints for `shard-012` and malformed hints for `shard-030`
/// - offsets `journal/part-001 = 42`, `journal/part-002 = 43` and
///   `other-journal/part-002 = 44`
///
/// # Panics
///
/// Panics if the hints fixture cannot be encoded.
#[must_use]
pub fn tree_fixture() -> Node {
    let shard012 = serde_json::to_string(&hints_fixture()).expect("hints encode");

    Node::dir(
        "/foo",
        vec![
            Node::dir(
                "/foo/hints",
                vec![
                    Node::leaf("/foo/hints/shard-012", shard012),
                    Node::leaf("/foo/hints/shard-030", "... malformed ..."),
                ],
            ),
            Node::dir(
                "/foo/offsets",
                vec![
                    Node::dir(
                        "/foo/offsets/journal",
                        vec![
                            Node::leaf("/foo/offsets/journal/part-001", "2a"),
                            Node::leaf("/foo/offsets/journal/part-002", "2b"),
                        ],
                    ),
                    Node::dir(
                        "/foo/offsets/other-journal",
                        vec![Node::leaf("/foo/offsets/other-journal/part-002", "2c")],
                    ),
                ],
            ),
        ],
    )
}

/// Topics `foo:1`, `bar:4`, `baz:16`, mapping onto 16 shards.
#[must_use]
pub fn topics_fixture() -> Vec<TopicDescription> {
    vec![
        TopicDescription::new("foo", 1),
        TopicDescription::new("bar", 4),
        TopicDescription::new("baz", 16),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_fixture_shape() {
        let tree = tree_fixture();
        assert_eq!(tree.leaf_count(), 5);
        assert_eq!(
            tree.nodes[1].nodes[1].nodes[0].key,
            "/foo/offsets/other-journal/part-002"
        );
    }
}
