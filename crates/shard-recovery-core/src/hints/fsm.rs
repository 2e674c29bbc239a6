//! FSM hints data model.
//!
//! Hints describe where in a recovery log a shard's local store can be rebuilt
//! from. Field names on the wire are PascalCase so hints written by running
//! shards stay readable across versions.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::journal::{JournalName, Mark};

/// Identifier of a file node in the recovery log's filesystem model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fnode(pub i64);

/// Recorder that wrote a contiguous range of the recovery log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderRange {
    #[serde(rename = "ID")]
    pub id: u32,

    /// Last sequence number written by this recorder.
    #[serde(rename = "LastSeqNo")]
    pub last_seq_no: i64,
}

/// Metadata from which a shard's local store is recovered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FsmHints {
    /// Position in the recovery log at which replay begins.
    pub log_mark: Mark,

    /// Checksum of the first operation to replay.
    pub first_checksum: u32,

    /// Sequence number of the first operation to replay.
    pub first_seq_no: i64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub recorders: Vec<RecorderRange>,

    /// File nodes whose writes are skipped during replay.
    #[serde(default, deserialize_with = "null_as_default")]
    pub skip_writes: Vec<Fnode>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: BTreeMap<String, String>,
}

impl FsmHints {
    /// Hints for a shard with no recorded history: replay `log` from its start.
    #[must_use]
    pub fn initial(log: JournalName) -> Self {
        Self {
            log_mark: Mark::new(log, -1),
            ..Self::default()
        }
    }

    /// Whether these hints carry no recorded history.
    #[must_use]
    pub fn is_initial(&self) -> bool {
        self.log_mark.offset == -1 && self.first_seq_no == 0 && self.recorders.is_empty()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_field_names() {
        let hints = FsmHints {
            log_mark: Mark::new("logs/shard-001", 12),
            first_checksum: 7,
            first_seq_no: 3,
            recorders: vec![RecorderRange { id: 1, last_seq_no: 2 }],
            skip_writes: vec![Fnode(9)],
            properties: BTreeMap::from([("k".to_string(), "v".to_string())]),
        };
        let json = serde_json::to_value(&hints).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "LogMark": {"Journal": "logs/shard-001", "Offset": 12},
                "FirstChecksum": 7,
                "FirstSeqNo": 3,
                "Recorders": [{"ID": 1, "LastSeqNo": 2}],
                "SkipWrites": [9],
                "Properties": {"k": "v"},
            })
        );
    }

    #[test]
    fn test_null_collections_decode_empty() {
        let json = r#"{"LogMark":{"Journal":"a","Offset":-1},"FirstChecksum":0,
            "FirstSeqNo":0,"Recorders":null,"SkipWrites":null,"Properties":null}"#;
        let hints: FsmHints = serde_json::from_str(json).unwrap();
        assert_eq!(hints, FsmHints::initial(JournalName::from("a")));
    }

    #[test]
    fn test_initial() {
        let hints = FsmHints::initial(JournalName::from("logs/shard-003"));
        assert!(hints.is_initial());
        assert_eq!(hints.log_mark.journal.as_str(), "logs/shard-003");
        assert_eq!(hints.log_mark.offset, -1);
        assert!(hints.properties.is_empty());
    }
}
