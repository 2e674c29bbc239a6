//! Domain error types for shard bootstrap and recovery reconciliation.
//!
//! Uses `thiserror` for ergonomic error definitions with proper context.

use std::num::ParseIntError;
use std::path::PathBuf;

use thiserror::Error;

use crate::bootstrap::BootstrapState;

/// Errors related to configuration parsing and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Every topic's partition count must divide the largest partition count.
    #[error("topic partitions must be multiples of each other")]
    PartitionsNotMultiples,

    /// At least one topic is required to derive a shard count.
    #[error("no topics configured")]
    NoTopics,

    /// A topic must have at least one partition.
    #[error("topic '{topic}' must have at least one partition")]
    ZeroPartitions { topic: String },

    /// Topic names must be non-empty and must not embed a partition suffix.
    #[error("invalid topic name '{0}'")]
    InvalidTopicName(String),

    /// The same topic is listed twice.
    #[error("topic '{0}' is configured more than once")]
    DuplicateTopic(String),

    /// Coordination roots are absolute slash-separated paths.
    #[error("invalid coordination root '{0}': must start with '/'")]
    InvalidCoordinationRoot(String),

    /// Retry settings are inconsistent.
    #[error("invalid retry config: {0}")]
    InvalidRetry(String),

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

/// Errors returned by a coordination service client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinationError {
    /// The requested key does not exist.
    #[error("key not found: {key}")]
    NotFound { key: String },

    /// The service could not be reached or timed out.
    #[error("coordination service unavailable: {message}")]
    Unavailable { message: String },

    /// The service refused the operation (e.g. writing a value onto a directory).
    #[error("coordination request rejected for '{key}': {message}")]
    Rejected { key: String, message: String },
}

impl CoordinationError {
    /// Whether the failure may succeed if the same request is issued again.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Errors from the embedded local store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Another handle already owns the store directory.
    #[error("local store at '{}' is locked by another owner: {message}", path.display())]
    Locked { path: PathBuf, message: String },

    /// Underlying storage engine failure.
    #[error("rocksdb error: {0}")]
    RocksDb(#[from] rocksdb::Error),
}

/// Errors loading or storing FSM hints.
#[derive(Error, Debug)]
pub enum HintsError {
    /// Stored hints are not valid JSON; the parser message is kept verbatim.
    #[error("{0}")]
    Decode(#[source] serde_json::Error),

    /// Hints could not be encoded.
    #[error("failed to encode hints: {0}")]
    Encode(#[source] serde_json::Error),

    /// Writing the hints to the coordination service failed.
    #[error("failed to store hints at '{path}': {source}")]
    Store {
        path: String,
        #[source]
        source: CoordinationError,
    },
}

/// Errors decoding composite local-store keys.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TupleError {
    /// Key ended in the middle of an element.
    #[error("truncated tuple at byte {0}")]
    Truncated(usize),

    /// Unknown element type code.
    #[error("unknown tuple type code {code:#04x} at byte {position}")]
    UnknownTypeCode { code: u8, position: usize },

    /// String element is not valid UTF-8.
    #[error("tuple string element is not valid utf-8")]
    InvalidUtf8,

    /// Integer element wider than 64 bits.
    #[error("tuple integer element of {0} bytes overflows i64")]
    IntegerOverflow(usize),
}

/// Errors loading, decoding or persisting journal offsets.
#[derive(Error, Debug)]
pub enum OffsetError {
    /// Offset value is not a hexadecimal signed 64-bit integer.
    #[error("invalid offset {value:?}: {source}")]
    ParseOffset {
        value: String,
        #[source]
        source: ParseIntError,
    },

    /// Offset mark key does not have exactly two components.
    #[error("bad DB mark length {len}: {key}")]
    BadMarkLength { len: usize, key: String },

    /// Journal component of an offset mark key is not a string.
    #[error("bad DB mark value: {key}")]
    BadMarkValue { key: String },

    /// Offset mark key bytes could not be decoded.
    #[error("bad DB mark key: {0}")]
    Tuple(#[from] TupleError),

    /// Offset value bytes are not UTF-8.
    #[error("offset value for {journal} is not valid utf-8")]
    ValueEncoding { journal: String },

    /// Local store failure.
    #[error("local store error: {0}")]
    Store(#[from] StoreError),

    /// Coordination service failure while mirroring offsets.
    #[error("coordination error: {0}")]
    Coordination(#[from] CoordinationError),
}

/// Error reported by an external recovery log replayer.
#[derive(Error, Debug)]
#[error("recovery log replay failed for {journal}: {message}")]
pub struct ReplayError {
    pub journal: String,
    pub message: String,
}

/// Errors that abort a shard bootstrap.
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// Static misconfiguration, never retried.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Coordination tree could not be fetched.
    #[error("coordination error: {0}")]
    Coordination(#[from] CoordinationError),

    /// Hints are malformed.
    #[error("hints error: {0}")]
    Hints(#[from] HintsError),

    /// Recovery log replay failed.
    #[error(transparent)]
    Replay(#[from] ReplayError),

    /// Offsets could not be reconciled.
    #[error("offset error: {0}")]
    Offsets(#[from] OffsetError),

    /// A step was invoked from the wrong state.
    #[error("invalid bootstrap transition from {from} to {to}")]
    InvalidTransition {
        from: BootstrapState,
        to: BootstrapState,
    },

    /// The consumer loop refused the recovered shard.
    #[error("shard hand-off failed: {0}")]
    Handoff(String),
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for coordination operations.
pub type CoordinationResult<T> = std::result::Result<T, CoordinationError>;

/// Result type alias for local store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for hints operations.
pub type HintsResult<T> = std::result::Result<T, HintsError>;

/// Result type alias for offset operations.
pub type OffsetResult<T> = std::result::Result<T, OffsetError>;

/// Result type alias for bootstrap operations.
pub type Result<T> = std::result::Result<T, BootstrapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partitions_not_multiples_message() {
        let err = ConfigError::PartitionsNotMultiples;
        assert_eq!(
            err.to_string(),
            "topic partitions must be multiples of each other"
        );
    }

    #[test]
    fn test_bad_mark_length_display() {
        let err = OffsetError::BadMarkLength {
            len: 3,
            key: "(\"_mark\", \"a/journal\", \"foo\")".to_string(),
        };
        assert!(err.to_string().starts_with("bad DB mark length 3"));
    }

    #[test]
    fn test_parse_offset_names_value() {
        let source = i64::from_str_radix("invalid", 16).unwrap_err();
        let err = OffsetError::ParseOffset {
            value: "invalid".to_string(),
            source,
        };
        let msg = err.to_string();
        assert!(msg.contains("\"invalid\""));
        assert!(msg.contains("invalid digit"));
    }

    #[test]
    fn test_coordination_transient() {
        assert!(CoordinationError::Unavailable {
            message: "timeout".to_string()
        }
        .is_transient());
        assert!(!CoordinationError::NotFound {
            key: "/a".to_string()
        }
        .is_transient());
    }

    #[test]
    fn test_bootstrap_error_from_config() {
        let err: BootstrapError = ConfigError::NoTopics.into();
        assert!(matches!(err, BootstrapError::Config(ConfigError::NoTopics)));
    }

    #[test]
    fn test_bootstrap_error_from_offsets() {
        let err: BootstrapError = OffsetError::BadMarkValue {
            key: "k".to_string(),
        }
        .into();
        assert!(matches!(err, BootstrapError::Offsets(_)));
    }
}
