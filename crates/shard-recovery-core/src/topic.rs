//! Topic descriptions.

use serde::{Deserialize, Serialize};

use crate::journal::PARTITION_SEPARATOR;

/// A topic's name and partition count.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopicDescription {
    /// Topic name, used as the journal name prefix.
    pub name: String,

    /// Number of partitions. Must be positive.
    pub partitions: u32,
}

impl TopicDescription {
    #[must_use]
    pub fn new(name: impl Into<String>, partitions: u32) -> Self {
        Self {
            name: name.into(),
            partitions,
        }
    }

    /// Whether the name can prefix a journal name unambiguously.
    #[must_use]
    pub fn has_valid_name(&self) -> bool {
        !self.name.is_empty() && !self.name.contains(PARTITION_SEPARATOR)
    }
}
