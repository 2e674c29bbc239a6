//! Configuration types for a recovering shard.
//!
//! Configuration is loaded from YAML files and validated before use.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::mapper::num_shards;
use crate::shard::ShardId;
use crate::topic::TopicDescription;

/// Root configuration for one shard.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShardConfig {
    /// Shard identity and locations.
    pub shard: ShardSettings,

    /// Topics consumed by the shard group.
    pub topics: Vec<TopicDescription>,

    /// Retry policy for coordination service I/O.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Prometheus metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Shard identity and the locations it recovers from.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShardSettings {
    /// Ordinal of this shard.
    pub id: ShardId,

    /// Coordination tree directory holding `hints/` and `offsets/`.
    pub coordination_root: String,

    /// Prefix of per-shard recovery log journal names.
    ///
    /// The shard name is appended verbatim, so this usually ends with `/`.
    #[serde(default = "default_recovery_log_root")]
    pub recovery_log_root: String,

    /// Directory of the shard's local store.
    /// Supports environment variable expansion: "${STATE_DIR}/shard-005"
    pub local_dir: String,
}

impl ShardSettings {
    /// Get the local store directory with environment variables expanded.
    #[must_use]
    pub fn local_dir(&self) -> PathBuf {
        PathBuf::from(expand_env_vars(&self.local_dir))
    }
}

/// Bounded exponential backoff for coordination I/O.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound on any single delay, in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl RetryConfig {
    #[must_use]
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    #[must_use]
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    /// Validate the retry configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_attempts` is zero or the initial backoff
    /// exceeds the maximum.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidRetry(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::InvalidRetry(format!(
                "initial_backoff_ms ({}) exceeds max_backoff_ms ({})",
                self.initial_backoff_ms, self.max_backoff_ms
            )));
        }
        Ok(())
    }
}

/// Prometheus metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// Whether bootstrap metrics are recorded.
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output logs in JSON format (for production).
    #[serde(default)]
    pub json: bool,
}

/// Expand environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of the environment variable `VAR_NAME`.
/// If the variable is not set, replaces with an empty string.
fn expand_env_vars(s: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN
        .get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));
    re.replace_all(s, |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_default()
    })
    .to_string()
}

// Default value functions

fn default_recovery_log_root() -> String {
    "recovery/logs/".to_string()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

// Default implementations

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Configuration loading and validation

impl ShardConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if
    /// validation fails.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or validation fails.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the coordination root is not an absolute path
    /// - a topic name is empty, embeds `/part-`, or repeats
    /// - the topic partition counts cannot be mapped onto shards
    /// - the retry settings are inconsistent
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.shard.coordination_root.starts_with('/') {
            return Err(ConfigError::InvalidCoordinationRoot(
                self.shard.coordination_root.clone(),
            ));
        }

        let mut seen = HashSet::new();
        for topic in &self.topics {
            if !topic.has_valid_name() {
                return Err(ConfigError::InvalidTopicName(topic.name.clone()));
            }
            if !seen.insert(topic.name.as_str()) {
                return Err(ConfigError::DuplicateTopic(topic.name.clone()));
            }
        }

        num_shards(&self.topics)?;
        self.retry.validate()
    }

    /// Number of shards the configured topics require.
    ///
    /// # Errors
    ///
    /// Returns an error if the topic set is invalid.
    pub fn num_shards(&self) -> ConfigResult<u32> {
        num_shards(&self.topics)
    }
}
