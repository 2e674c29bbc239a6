//! Test utilities for shard bootstrap and recovery.
//!
//! This module provides infrastructure for integration testing:
//!
//! - [`MockCoordinator`] - An in-memory coordination service that records calls
//!   and injects failures
//! - [`MemoryReplayer`] - A recovery log replayer handing out a prepared store
//! - [`RecordingRunner`] - A consumer loop that keeps the shard it is handed
//! - [`BootstrapTestHarness`] - All of the above wired to a [`ShardBootstrap`]
//!
//! # Example
//!
//! ```rust,ignore
//! use shard_recovery_core::testing::BootstrapTestHarness;
//!
//! #[tokio::test]
//! async fn test_cold_start() {
//!     let harness = BootstrapTestHarness::new();
//!     let mut bootstrap = harness.bootstrap();
//!
//!     bootstrap.run(&harness.runner).await.unwrap();
//!     assert!(harness.runner.take().unwrap().hints.is_initial());
//! }
//! ```
//!
//! [`ShardBootstrap`]: crate::bootstrap::ShardBootstrap

pub mod fixtures;
pub mod harness;
pub mod mock_coordinator;
pub mod replayer;

pub use fixtures::{hints_fixture, topics_fixture, tree_fixture};
pub use harness::{BootstrapTestHarness, RecordingRunner, TestHarnessBuilder};
pub use mock_coordinator::{CoordinationCall, CoordinationOp, MockCoordinator};
pub use replayer::{MemoryReplayer, ReplayCall};
