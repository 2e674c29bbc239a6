//! Shard Recovery CLI
//!
//! Operator tool answering which journals a shard owns and what state a shard
//! would recover with, from a shard configuration and a coordination tree
//! snapshot.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use shard_recovery_core::config::{LoggingConfig, ShardConfig};
use shard_recovery_core::coordination::normalize_key;
use shard_recovery_core::hints::load_hints;
use shard_recovery_core::offsets::load_offsets_from_tree;
use shard_recovery_core::{
    shards_for_journal, BootstrapError, BootstrapMetrics, ExistingStoreReplayer, JournalName,
    JournalOffsetMap, MemoryCoordinator, Node, RecoveredShard, RocksStore, ShardAssignment,
    ShardBootstrap, ShardId, ShardRunner,
};

/// Shard assignment and recovery state inspection.
#[derive(Parser)]
#[command(name = "shard-recovery")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, default_value = "shard.yaml")]
    config: String,

    /// Increase logging verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the journals a shard owns.
    Assignment {
        /// Shard to resolve instead of the configured one.
        #[arg(long)]
        shard: Option<u32>,
    },

    /// Print the shards owning a journal.
    Owners {
        /// Journal name, e.g. `events/part-003`.
        journal: String,
    },

    /// Print the hints and owned offsets a coordination tree snapshot holds
    /// for a shard.
    Inspect {
        /// JSON snapshot of the tree under the coordination root.
        #[arg(long)]
        tree: PathBuf,

        /// Shard to inspect instead of the configured one.
        #[arg(long)]
        shard: Option<u32>,
    },

    /// Run a full bootstrap against a tree snapshot and the local store
    /// already present in the configured local directory.
    Recover {
        /// JSON snapshot of the tree under the coordination root.
        #[arg(long)]
        tree: PathBuf,

        /// Print Prometheus metrics after the run.
        #[arg(long)]
        print_metrics: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = ShardConfig::from_file(&args.config)?;

    // Override log level from verbosity flag
    let log_config = match args.verbose {
        0 => config.logging.clone(),
        1 => LoggingConfig {
            level: "debug".to_string(),
            ..config.logging.clone()
        },
        _ => LoggingConfig {
            level: "trace".to_string(),
            ..config.logging.clone()
        },
    };

    setup_tracing(&log_config);

    let num_shards = config.num_shards()?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        shard = %config.shard.id,
        coordination_root = %config.shard.coordination_root,
        num_shards,
        "loaded shard configuration"
    );

    match args.command {
        Command::Assignment { shard } => print_assignment(&config, shard),
        Command::Owners { journal } => print_owners(&config, &journal),
        Command::Inspect { tree, shard } => inspect(&config, &tree, shard),
        Command::Recover {
            tree,
            print_metrics,
        } => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(async move { recover(&config, &tree, print_metrics).await })
        }
    }
}

/// Logs go to stderr so stdout carries only command output.
fn setup_tracing(config: &LoggingConfig) {
    let level = match config.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_assignment(config: &ShardConfig, shard: Option<u32>) -> anyhow::Result<()> {
    let shard = shard.map_or(config.shard.id, ShardId);
    let assignment = ShardAssignment::compute(&config.topics, shard)?;

    let journals: Vec<&str> = assignment
        .sorted_journals()
        .into_iter()
        .map(JournalName::as_str)
        .collect();
    let output = json!({
        "shard": shard.name(),
        "num_shards": assignment.num_shards(),
        "aliased": assignment.is_aliased(),
        "journals": journals,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_owners(config: &ShardConfig, journal: &str) -> anyhow::Result<()> {
    let journal = JournalName::from(journal);
    let owners = shards_for_journal(&config.topics, &journal);
    if owners.is_empty() {
        anyhow::bail!("journal '{journal}' is not a partition of any configured topic");
    }

    let output = json!({
        "journal": journal.as_str(),
        "shards": owners.iter().map(ShardId::name).collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn read_tree(path: &Path) -> anyhow::Result<Node> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read tree snapshot '{}'", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse tree snapshot '{}'", path.display()))
}

fn inspect(config: &ShardConfig, tree_path: &Path, shard: Option<u32>) -> anyhow::Result<()> {
    let shard = shard.map_or(config.shard.id, ShardId);
    let tree = read_tree(tree_path)?;

    let hints = load_hints(shard, &config.shard.recovery_log_root, &tree)?;
    let assignment = ShardAssignment::compute(&config.topics, shard)?;
    let mut mirrored = load_offsets_from_tree(&tree)?;
    mirrored.retain(|journal, _| assignment.owns(journal.as_str()));

    let output = json!({
        "shard": shard.name(),
        "initial_hints": hints.is_initial(),
        "hints": hints,
        "mirrored_offsets": sorted_offsets(&mirrored),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn sorted_offsets(offsets: &JournalOffsetMap) -> BTreeMap<&str, i64> {
    offsets
        .iter()
        .map(|(journal, offset)| (journal.as_str(), *offset))
        .collect()
}

async fn recover(config: &ShardConfig, tree_path: &Path, print_metrics: bool) -> anyhow::Result<()> {
    let tree = read_tree(tree_path)?;
    if !same_root(&tree.key, &config.shard.coordination_root) {
        anyhow::bail!(
            "tree snapshot is rooted at '{}', expected '{}'",
            tree.key,
            config.shard.coordination_root
        );
    }

    let coordinator = Arc::new(MemoryCoordinator::from_tree(&tree));
    let metrics = BootstrapMetrics::new();
    let mut bootstrap = ShardBootstrap::new(config, coordinator, ExistingStoreReplayer);
    if config.metrics.enabled {
        bootstrap = bootstrap.with_metrics(metrics.clone());
    }

    bootstrap.run(&ReportRunner).await?;

    if print_metrics {
        print!("{}", metrics.encode()?);
    }
    Ok(())
}

/// Whether two coordination keys name the same node, ignoring a trailing slash.
fn same_root(a: &str, b: &str) -> bool {
    normalize_key(a) == normalize_key(b)
}

/// Prints the recovered shard and releases it.
struct ReportRunner;

#[async_trait]
impl ShardRunner<RocksStore> for ReportRunner {
    async fn start(&self, shard: RecoveredShard<RocksStore>) -> shard_recovery_core::Result<()> {
        let journals: Vec<&str> = shard
            .assignment
            .sorted_journals()
            .into_iter()
            .map(JournalName::as_str)
            .collect();
        let output = json!({
            "shard": shard.shard.name(),
            "local_dir": shard.store.path().display().to_string(),
            "hints": shard.hints,
            "journals": journals,
            "offsets": sorted_offsets(&shard.offsets),
            "hints_path": shard.hints_writer.path(),
        });
        let rendered = serde_json::to_string_pretty(&output)
            .map_err(|err| BootstrapError::Handoff(err.to_string()))?;
        println!("{rendered}");
        Ok(())
    }
}
