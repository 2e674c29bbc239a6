//! Integration tests for FSM hints persistence.
//!
//! Tests loading hints out of coordination tree snapshots and writing them
//! back through the coordination client.

use std::sync::Arc;

use shard_recovery_core::coordination::{CoordinationClient, Node};
use shard_recovery_core::error::{CoordinationError, HintsError};
use shard_recovery_core::hints::{hints_path, load_hints, spawn_store_hints, store_hints};
use shard_recovery_core::testing::{hints_fixture, tree_fixture, CoordinationOp, MockCoordinator};
use shard_recovery_core::{FsmHints, HintsWriter, JournalName, ShardId};

// =============================================================================
// Loading
// =============================================================================

/// Test that stored hints are decoded.
#[test]
fn test_load_stored_hints() {
    let hints = load_hints(ShardId(12), "path/to/recovery/logs/", &tree_fixture()).unwrap();
    assert_eq!(hints, hints_fixture());
    assert!(!hints.is_initial());
}

/// Test that a shard without hints starts its recovery log from the beginning.
#[test]
fn test_load_initial_hints() {
    let hints = load_hints(ShardId(8), "path/to/recovery/logs/", &tree_fixture()).unwrap();

    assert_eq!(
        hints.log_mark.journal,
        JournalName::from("path/to/recovery/logs/shard-008")
    );
    assert_eq!(hints.log_mark.offset, -1);
    assert!(hints.is_initial());
    assert!(hints.recorders.is_empty());
}

/// Test that an empty tree yields initial hints.
#[test]
fn test_load_from_empty_tree() {
    let tree = Node::dir("/foo", Vec::new());
    let hints = load_hints(ShardId(0), "logs/", &tree).unwrap();
    assert_eq!(hints, FsmHints::initial(JournalName::from("logs/shard-000")));
}

/// Test that malformed hints surface the JSON parser's message.
#[test]
fn test_load_malformed_hints() {
    let err = load_hints(ShardId(30), "path/to/recovery/logs/", &tree_fixture()).unwrap_err();

    let expected = serde_json::from_str::<FsmHints>("... malformed ...").unwrap_err();
    assert!(matches!(err, HintsError::Decode(_)));
    assert_eq!(err.to_string(), expected.to_string());
}

/// Test that hints are looked up under the snapshot's own root.
#[test]
fn test_load_under_other_root() {
    let tree = Node::dir(
        "/bar",
        vec![Node::dir(
            "/bar/hints",
            vec![Node::leaf(
                "/bar/hints/shard-012",
                serde_json::to_string(&hints_fixture()).unwrap(),
            )],
        )],
    );

    assert_eq!(load_hints(ShardId(12), "x/", &tree).unwrap(), hints_fixture());
    assert!(load_hints(ShardId(12), "x/", &tree_fixture())
        .unwrap()
        .log_mark
        .journal
        .as_str()
        .starts_with("some/"));
}

/// Test the wire field names of encoded hints.
#[test]
fn test_hints_wire_format() {
    let encoded: serde_json::Value = serde_json::to_value(hints_fixture()).unwrap();

    assert_eq!(encoded["LogMark"]["Journal"], "some/recovery/logs/shard-012");
    assert_eq!(encoded["LogMark"]["Offset"], 1234);
    assert_eq!(encoded["FirstChecksum"], 1_212_123);
    assert_eq!(encoded["FirstSeqNo"], 45_645);
    assert_eq!(encoded["Recorders"][0]["ID"], 123);
    assert_eq!(encoded["SkipWrites"][1], 46);
    assert_eq!(encoded["Properties"]["foo"], "bar");
}

// =============================================================================
// Storing
// =============================================================================

/// Test that stored hints are written at the shard's path and load back.
#[tokio::test]
async fn test_store_then_load() {
    let mock = MockCoordinator::new();
    let path = hints_path("/foo", ShardId(12));
    store_hints(&mock, &hints_fixture(), &path).await.unwrap();

    let calls = mock.get_set_calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].key, "/foo/hints/shard-012");

    let tree = mock.get("/foo", true).await.unwrap();
    assert_eq!(
        load_hints(ShardId(12), "unused/", &tree).unwrap(),
        hints_fixture()
    );
}

/// Test that a rejected write names the path.
#[tokio::test]
async fn test_store_rejected() {
    let mock = MockCoordinator::new();
    mock.push_failure(CoordinationError::Rejected {
        key: "/foo/hints/shard-012".to_string(),
        message: "permission denied".to_string(),
    })
    .await;

    let err = store_hints(&mock, &hints_fixture(), "/foo/hints/shard-012")
        .await
        .unwrap_err();
    assert!(matches!(err, HintsError::Store { ref path, .. } if path == "/foo/hints/shard-012"));
    assert!(mock.inner().is_empty());
}

/// Test that a background write resolves once the write is applied.
#[tokio::test]
async fn test_spawn_store() {
    let mock = Arc::new(MockCoordinator::new());
    let handle = spawn_store_hints(
        mock.clone(),
        hints_fixture(),
        hints_path("/foo", ShardId(3)),
    );

    handle.await.unwrap().unwrap();
    assert!(mock.inner().value("/foo/hints/shard-003").is_some());
}

/// Test that successive writes replace the previous hints.
#[tokio::test]
async fn test_writer_overwrites() {
    let mock = Arc::new(MockCoordinator::new());
    let writer = HintsWriter::new(mock.clone(), "/foo", ShardId(12));

    writer.store(&hints_fixture()).await.unwrap();
    let mut next = hints_fixture();
    next.log_mark.offset = 5678;
    writer.store(&next).await.unwrap();

    let tree = mock.get("/foo", true).await.unwrap();
    assert_eq!(load_hints(ShardId(12), "", &tree).unwrap(), next);
    assert_eq!(mock.inner().len(), 1);

    let ops: Vec<CoordinationOp> = mock.get_calls().await.iter().map(|c| c.op).collect();
    assert_eq!(
        ops,
        vec![
            CoordinationOp::Set,
            CoordinationOp::Set,
            CoordinationOp::Get { recursive: true }
        ]
    );
}
