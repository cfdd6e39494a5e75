//! # CLI Interface
//!
//! Defines the command-line argument structure for `vesper-node` using
//! `clap` derive. Supports four subcommands: `run`, `init`, `status`,
//! and `version`.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use vesper_consensus::config::NodeConfig;

/// Vesper proof-of-stake validator node.
///
/// A full validator node for the Vesper consensus core. Participates in
/// stake-weighted proposer election, serves the JSON-RPC/REST API, and
/// exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "vesper-node",
    about = "Vesper proof-of-stake validator node",
    version,
    propagate_version = true
)]
pub struct VesperNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the Vesper node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the validator node.
    Run(RunArgs),
    /// Initialize a new node — creates the data directory and generates
    /// a fresh validator keypair.
    Init(InitArgs),
    /// Query the status of a running node via its RPC endpoint.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the node configuration file (TOML). Currently unused beyond
    /// validation — all configuration is taken from flags/environment.
    #[arg(long, short = 'c', env = "VESPER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the node data directory where blocks and keys are stored.
    ///
    /// Created on first run if it does not exist.
    #[arg(long, short = 'd', env = "VESPER_DATA_DIR", default_value = "~/.vesper")]
    pub data_dir: PathBuf,

    /// Address for the JSON-RPC and REST API.
    #[arg(long, env = "VESPER_RPC_ADDR", default_value = "0.0.0.0:9741")]
    pub rpc_addr: String,

    /// Address for the Prometheus metrics endpoint.
    #[arg(long, env = "VESPER_METRICS_ADDR", default_value = "0.0.0.0:9742")]
    pub metrics_addr: String,

    /// Default `tracing` log level when `RUST_LOG` is not set.
    #[arg(long, env = "VESPER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Run with an ephemeral data directory and a fresh keypair, discarded
    /// on exit. Convenient for local experimentation.
    #[arg(long)]
    pub dev: bool,

    /// Per-node consensus configuration (stake, timeouts, storage limits).
    #[command(flatten)]
    pub node: NodeConfig,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Path to the data directory to initialize.
    #[arg(long, short = 'd', env = "VESPER_DATA_DIR", default_value = "~/.vesper")]
    pub data_dir: PathBuf,

    /// Overwrite an existing data directory's validator key.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// RPC endpoint of the running node.
    #[arg(long, default_value = "http://127.0.0.1:9741")]
    pub rpc_url: String,
}

/// Expands a leading `~` to the user's home directory; returns the path
/// unchanged otherwise.
pub fn resolve_data_dir(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}

/// Validates a `tracing`-style log level string.
pub fn validate_log_level(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        VesperNodeCli::command().debug_assert();
    }

    #[test]
    fn resolve_data_dir_expands_tilde() {
        std::env::set_var("HOME", "/home/demo");
        let resolved = resolve_data_dir(Path::new("~/.vesper"));
        assert_eq!(resolved, PathBuf::from("/home/demo/.vesper"));
    }

    #[test]
    fn resolve_data_dir_leaves_absolute_paths_unchanged() {
        let resolved = resolve_data_dir(Path::new("/var/lib/vesper"));
        assert_eq!(resolved, PathBuf::from("/var/lib/vesper"));
    }

    #[test]
    fn log_level_validation() {
        assert!(validate_log_level("info"));
        assert!(validate_log_level("debug"));
        assert!(!validate_log_level("garbage"));
    }
}
