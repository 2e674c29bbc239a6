//! Journal names, marks and offset maps.
//!
//! A journal is the offset-addressed byte stream backing one topic partition.
//! Journal names follow `<topic>/part-<NNN>`, with the partition index
//! zero-padded to at least three digits.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Separator between a topic name and its partition index.
pub const PARTITION_SEPARATOR: &str = "/part-";

/// Mapping from journal name to a byte offset within that journal.
pub type JournalOffsetMap = HashMap<JournalName, i64>;

fn partition_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(.+)/part-(\d{3,})$").expect("valid regex"))
}

/// Name of a journal.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JournalName(String);

impl JournalName {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Name of the journal backing `partition` of `topic`.
    #[must_use]
    pub fn for_partition(topic: &str, partition: u32) -> Self {
        Self(format!("{topic}{PARTITION_SEPARATOR}{partition:03}"))
    }

    /// Split a partition journal name into its topic and partition index.
    ///
    /// Returns `None` for names not following the partition convention.
    #[must_use]
    pub fn partition(&self) -> Option<(&str, u32)> {
        let caps = partition_pattern().captures(&self.0)?;
        let topic = caps.get(1)?.as_str();
        let partition = caps.get(2)?.as_str().parse().ok()?;
        Some((topic, partition))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for JournalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for JournalName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for JournalName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JournalName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for JournalName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A position within a journal.
///
/// An offset of `-1` means "from the beginning of the journal".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Mark {
    pub journal: JournalName,
    pub offset: i64,
}

impl Mark {
    #[must_use]
    pub fn new(journal: impl Into<JournalName>, offset: i64) -> Self {
        Self {
            journal: journal.into(),
            offset,
        }
    }
}
