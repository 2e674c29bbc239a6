//! Shard Recovery Core Library
//!
//! This library recovers a stream-consumer shard after a crash or migration:
//! it rebuilds the shard's local store from a recovery log described by FSM
//! hints, reconciles the read offsets persisted in that store with the copy
//! mirrored in a coordination service, and resolves which topic partitions
//! (journals) the shard owns.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Domain-specific error types
//! - [`mapper`] - Shard count and shard-to-journal ownership
//! - [`hints`] - FSM hints stored in the coordination tree
//! - [`offsets`] - Offset loading, persistence and merging
//! - [`bootstrap`] - The recovery state machine
//! - [`coordination`] - Coordination service contract and tree snapshots
//! - [`store`] - Local store contract, RocksDB and in-memory stores
//! - [`retry`] - Bounded retries for coordination I/O
//! - [`metrics`] - Prometheus metrics collection
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use shard_recovery_core::{ShardBootstrap, ShardConfig};
//!
//! // Load configuration
//! let config = ShardConfig::from_file("shard.yaml")?;
//!
//! // Recover the shard and hand it to the consumer loop
//! let mut bootstrap = ShardBootstrap::new(&config, client, replayer);
//! bootstrap.run(&runner).await?;
//! ```

#![forbid(unsafe_code)]

pub mod bootstrap;
pub mod config;
pub mod coordination;
pub mod error;
pub mod hints;
pub mod journal;
pub mod mapper;
pub mod metrics;
pub mod offsets;
pub mod retry;
pub mod shard;
pub mod store;
pub mod topic;

/// Test utilities for integration testing.
///
/// This module is only available when compiling tests or when the `testing` feature is enabled.
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
pub use bootstrap::{
    BootstrapState, ExistingStoreReplayer, RecoveredShard, RecoveryLogReplayer, ShardBootstrap,
    ShardRunner,
};
pub use config::ShardConfig;
pub use coordination::{CoordinationClient, MemoryCoordinator, Node};
pub use error::{
    BootstrapError, ConfigError, CoordinationError, HintsError, OffsetError, ReplayError, Result,
    StoreError,
};
pub use hints::{FsmHints, HintsWriter};
pub use journal::{JournalName, JournalOffsetMap, Mark};
pub use mapper::{journals_for_shard, num_shards, shards_for_journal, ShardAssignment};
pub use metrics::BootstrapMetrics;
pub use retry::RetryPolicy;
pub use shard::ShardId;
pub use store::{LocalStore, MemoryStore, RocksStore, StoreBatch};
pub use topic::TopicDescription;
