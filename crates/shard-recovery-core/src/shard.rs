//! Shard identity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const SHARD_PREFIX: &str = "shard-";

/// Ordinal identifying one shard instance.
///
/// Renders as a zero-padded name (`shard-042`) used in coordination tree paths
/// and local identifiers. Ids above 999 render in full (`shard-1024`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShardId(pub u32);

impl ShardId {
    /// The shard's canonical name.
    #[must_use]
    pub fn name(&self) -> String {
        format!("{SHARD_PREFIX}{:03}", self.0)
    }

    #[must_use]
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl From<u32> for ShardId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SHARD_PREFIX}{:03}", self.0)
    }
}

/// Error parsing a shard name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid shard name '{0}' (expected 'shard-NNN')")]
pub struct ParseShardIdError(String);

impl FromStr for ShardId {
    type Err = ParseShardIdError;

    /// Accepts either `shard-NNN` or a bare ordinal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix(SHARD_PREFIX).unwrap_or(s);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseShardIdError(s.to_string()));
        }
        digits
            .parse::<u32>()
            .map(ShardId)
            .map_err(|_| ParseShardIdError(s.to_string()))
    }
}
