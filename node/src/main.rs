// Copyright (c) 2026 Vesper Labs. MIT License.
// See LICENSE for details.

//! # Vesper Validator Node
//!
//! Entry point for the `vesper-node` binary. Parses CLI arguments,
//! initializes logging and metrics, drives the consensus engine's round
//! loop, and serves the HTTP/WS API.
//!
//! The binary supports four subcommands:
//!
//! - `run`     — start the validator node
//! - `init`    — initialize data directory and generate keys
//! - `status`  — query a running node's status endpoint
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast;

use vesper_consensus::config;
use vesper_consensus::crypto::keys::ValidatorKeypair;
use vesper_consensus::network::transport::{ConsensusMessage, NodeView, TransportOut};
use vesper_consensus::network::{ConsensusEngine, ValidatorNode};
use vesper_consensus::storage::block::Block;
use vesper_consensus::storage::reconstructor::Reconstructor;
use vesper_consensus::transaction::{Transaction, TransactionKind};

use cli::{Commands, RunArgs, VesperNodeCli};
use logging::LogFormat;
use metrics::NodeMetrics;

/// Broadcast channel capacity for live event streaming. Large enough to
/// absorb short bursts without dropping events for connected WS clients.
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = VesperNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_node(args),
        Commands::Status(args) => query_status(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound transport
// ---------------------------------------------------------------------------

/// Transport used until a real gossip layer is wired in: every call is
/// logged and, for proposals, fanned into the metrics/event-stream side of
/// the node instead of being delivered to peers.
///
/// Locally-authored transactions (the init-time stake deposit, registration
/// after a commit) have nowhere else to go without a peer to gossip them
/// to, so `execute_and_broadcast_transaction` inserts them into this node's
/// own mempool — otherwise `create_block_proposal` would never see them and
/// they would be silently dropped on a single-node deployment.
struct LoggingTransport {
    node: Arc<ValidatorNode>,
    event_tx: broadcast::Sender<api::NodeEvent>,
    metrics: Arc<NodeMetrics>,
}

impl TransportOut for LoggingTransport {
    fn broadcast_consensus_message(&self, message: &ConsensusMessage) {
        match message {
            ConsensusMessage::Propose(block) => {
                tracing::debug!(number = block.number, "broadcasting consensus message (no peers configured)");
                self.metrics.blocks_processed_total.inc();
                self.metrics.block_height.set(block.number as i64);
                self.metrics.consensus_rounds_total.inc();
                let _ = self.event_tx.send(api::NodeEvent::NewBlock {
                    number: block.number,
                    hash: block.hash.clone(),
                    tx_count: block.transactions.len() as u64,
                    timestamp: block.timestamp,
                });
            }
        }
    }

    fn execute_and_broadcast_transaction(&self, transaction: &Transaction, kind: TransactionKind) {
        if let Err(e) = self.node.mempool().insert(transaction.clone()) {
            tracing::warn!(id = %transaction.id, %kind, error = %e, "failed to admit authored transaction into mempool");
        }
        self.metrics.transactions_processed_total.inc();
        tracing::trace!(id = %transaction.id, %kind, "executed and broadcast transaction");
    }

    fn execute_transaction(&self, transaction: &Transaction, kind: TransactionKind) {
        if let Err(e) = self
            .node
            .reconstructor()
            .lock()
            .live_db()
            .execute_transaction_list(std::slice::from_ref(transaction))
        {
            tracing::error!(id = %transaction.id, %kind, error = %e, "failed to execute transaction against live db");
        }
        self.metrics.transactions_processed_total.inc();
        tracing::trace!(id = %transaction.id, %kind, "executed transaction");
    }

    fn request_chain_subsection(&self, reference_block: &Block) {
        tracing::warn!(number = reference_block.number, "chain subsection requested but no peers are configured");
    }
}

// ---------------------------------------------------------------------------
// run — Full validator startup sequence
// ---------------------------------------------------------------------------

/// Starts the full validator node: API server, metrics endpoint, and a
/// background task driving the consensus engine's propose/timeout loop.
async fn run_node(args: RunArgs) -> Result<()> {
    let data_dir = cli::resolve_data_dir(&args.data_dir);

    let log_filter = format!(
        "vesper_node={level},vesper_consensus={level},tower_http=debug",
        level = args.log_level
    );
    logging::init_logging(&log_filter, LogFormat::Pretty);

    tracing::info!(
        rpc_addr = %args.rpc_addr,
        metrics_addr = %args.metrics_addr,
        data_dir = %data_dir.display(),
        dev = args.dev,
        stake = args.node.stake,
        "starting vesper-node"
    );

    let node = if args.dev {
        let dir = tempfile::tempdir().context("failed to create temporary data directory for dev mode")?;
        let node = ValidatorNode::init(dir.path(), &args.node, true).context("failed to initialize dev node")?;
        // Keep the temporary directory alive for the process's lifetime;
        // it is torn down by the OS on exit.
        std::mem::forget(dir);
        node
    } else {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;
        let is_first_node = directory_is_empty(&data_dir);
        ValidatorNode::init(&data_dir, &args.node, is_first_node).context("failed to initialize node")?
    };

    tracing::info!(address = %node.address(), "validator node ready");

    let node_metrics = Arc::new(NodeMetrics::new());
    let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

    let transport = Arc::new(LoggingTransport {
        node: node.clone(),
        event_tx: event_tx.clone(),
        metrics: Arc::clone(&node_metrics),
    });

    let engine = ConsensusEngine::new(
        args.node.clone(),
        node.clone() as Arc<dyn NodeView>,
        transport as Arc<dyn TransportOut>,
    );
    engine.init().await.context("failed to initialize consensus engine")?;

    let app_state = api::AppState {
        version: format!("{} (protocol {})", env!("CARGO_PKG_VERSION"), config::PROTOCOL_VERSION),
        node: node.clone() as Arc<dyn NodeView>,
        engine: Arc::clone(&engine),
        event_tx: event_tx.clone(),
        metrics: Arc::clone(&node_metrics),
    };

    let (shutdown_tx, _shutdown_rx) = tokio::sync::watch::channel(false);

    // Single-validator round loop: attempt a proposal every round; if the
    // engine made no progress before the proposal timeout elapses, drive a
    // timeout so the round advances and the sampler is re-rolled.
    let consensus_handle = {
        let engine = Arc::clone(&engine);
        let proposal_timeout = args.node.proposal_timeout();
        tokio::spawn(async move {
            loop {
                let before = engine.state();
                if let Ok(block) = engine.create_block_proposal() {
                    engine.handle_consensus_message(ConsensusMessage::Propose(block)).await;
                }
                tokio::time::sleep(proposal_timeout).await;
                let after = engine.state();
                if after.number == before.number && after.round == before.round {
                    engine.handle_timeout(before.number, before.round).await;
                }
            }
        })
    };

    let api_router = api::create_router(app_state.clone());
    let api_listener = tokio::net::TcpListener::bind(&args.rpc_addr)
        .await
        .with_context(|| format!("failed to bind RPC listener on {}", args.rpc_addr))?;
    tracing::info!("RPC/API server listening on {}", args.rpc_addr);

    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_listener = tokio::net::TcpListener::bind(&args.metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", args.metrics_addr))?;
    tracing::info!("Metrics server listening on {}", args.metrics_addr);

    print_startup_banner(node.address(), &args.rpc_addr, &data_dir.to_string_lossy(), args.node.stake);

    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    let _ = shutdown_tx.send(true);
    consensus_handle.abort();

    tracing::info!("vesper-node stopped");
    Ok(())
}

/// True if `dir` has no entries yet (fresh data directory, or one that
/// `create_dir_all` just created).
fn directory_is_empty(dir: &std::path::Path) -> bool {
    std::fs::read_dir(dir).map(|mut entries| entries.next().is_none()).unwrap_or(true)
}

// ---------------------------------------------------------------------------
// init — Data directory initialization
// ---------------------------------------------------------------------------

/// Initializes a new node data directory and generates a validator keypair.
///
/// Creates the directory structure:
/// ```text
/// {data_dir}/
///     <zipped block files>   — genesis block, written by the block store
///     keys/                  — validator keypair
/// ```
fn init_node(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("vesper_node=info", LogFormat::Pretty);

    let data_dir = cli::resolve_data_dir(&args.data_dir);
    tracing::info!(data_dir = %data_dir.display(), "initializing node");

    let keys_dir = data_dir.join("keys");
    let key_path = keys_dir.join("validator.key");

    if key_path.exists() && !args.force {
        anyhow::bail!(
            "data directory already initialized at {}. Use --force to overwrite.",
            data_dir.display()
        );
    }

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;
    std::fs::create_dir_all(&keys_dir)
        .with_context(|| format!("failed to create keys directory: {}", keys_dir.display()))?;

    let keypair = ValidatorKeypair::generate();
    let address = keypair.address();

    std::fs::write(&key_path, hex::encode(keypair.secret_key_bytes()))
        .with_context(|| format!("failed to write validator key to {}", key_path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&key_path, std::fs::Permissions::from_mode(0o600))?;
    }

    // Seeds the genesis block file in the data directory.
    let _reconstructor = Reconstructor::init(&data_dir, true, address.clone()).context("failed to seed genesis block")?;

    tracing::info!(address = %address, key_path = %key_path.display(), "validator keypair generated");

    println!();
    println!("Node initialized successfully.");
    println!();
    println!("  Data directory  : {}", data_dir.display());
    println!("  Validator key   : {}", key_path.display());
    println!("  Validator address: {}", address);
    println!("  Genesis block   : persisted at number 0");
    println!();
    println!("Run `vesper-node run -d {}` to start the node.", data_dir.display());

    Ok(())
}

// ---------------------------------------------------------------------------
// status — Query a running node
// ---------------------------------------------------------------------------

/// Queries a running node's status endpoint and prints the result.
async fn query_status(args: cli::StatusArgs) -> Result<()> {
    let url = format!("{}/status", args.rpc_url.trim_end_matches('/'));
    let body = minimal_http_get(&url).await?;

    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => {
            println!("Node Status");
            if let Some(v) = json.get("version").and_then(|v| v.as_str()) {
                println!("  Version       : {}", v);
            }
            if let Some(v) = json.get("address").and_then(|v| v.as_str()) {
                println!("  Address       : {}", v);
            }
            if let Some(v) = json.get("engine_status").and_then(|v| v.as_str()) {
                println!("  Engine status : {}", v);
            }
            if let Some(v) = json.get("block_number").and_then(|v| v.as_i64()) {
                println!("  Block number  : {}", v);
            }
            if let Some(v) = json.get("round").and_then(|v| v.as_u64()) {
                println!("  Round         : {}", v);
            }
            if let Some(v) = json.get("synced").and_then(|v| v.as_bool()) {
                println!("  Synced        : {}", if v { "yes" } else { "no" });
            }
            if let Some(v) = json.get("timestamp").and_then(|v| v.as_str()) {
                println!("  Timestamp     : {}", v);
            }
        }
        Err(_) => println!("{}", body),
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// version
// ---------------------------------------------------------------------------

/// Prints version information to stdout.
fn print_version() {
    println!("vesper-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol    {}", config::PROTOCOL_VERSION);
    println!("rustc       {}", rustc_version());
    if let Some(commit) = option_env!("GIT_COMMIT") {
        println!("commit      {}", commit);
    }
    if let Some(ts) = option_env!("BUILD_TIMESTAMP") {
        println!("built       {}", ts);
    }
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

// ---------------------------------------------------------------------------
// Startup banner
// ---------------------------------------------------------------------------

/// Prints the node startup banner with configuration summary.
fn print_startup_banner(address: &str, rpc_addr: &str, data_dir: &str, stake: u64) {
    let address_short = if address.len() > 20 { format!("{}...", &address[..20]) } else { address.to_string() };

    let lines = [
        format!("  Address:    {}", address_short),
        format!("  RPC:        http://{}", rpc_addr),
        format!("  Data:       {}", data_dir),
        format!("  Stake:      {}", stake),
    ];

    let title = format!("  Vesper Consensus \u{2014} Validator Node v{}", env!("CARGO_PKG_VERSION"));

    let max_width = lines.iter().map(|l| l.len()).chain(std::iter::once(title.len())).max().unwrap_or(50) + 4;
    let border = "\u{2550}".repeat(max_width);

    println!();
    println!("\u{2554}{}\u{2557}", border);
    println!("\u{2551}  {:<width$}  \u{2551}", title.trim(), width = max_width - 4);
    println!("\u{2560}{}\u{2563}", border);
    for line in &lines {
        println!("\u{2551}  {:<width$}  \u{2551}", line.trim(), width = max_width - 4);
    }
    println!("\u{255A}{}\u{255D}", border);
    println!();
}

// ---------------------------------------------------------------------------
// Shutdown signal
// ---------------------------------------------------------------------------

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

// ---------------------------------------------------------------------------
// Minimal HTTP client
// ---------------------------------------------------------------------------

/// Minimal HTTP GET without pulling in `reqwest` as a dependency, used only
/// by the `status` subcommand's one-shot query.
async fn minimal_http_get(url: &str) -> Result<String> {
    let parsed: MinimalUrl = url.parse().map_err(|e| anyhow::anyhow!("invalid URL: {}", e))?;

    let port = parsed.port.unwrap_or(80);
    let addr = format!("{}:{}", parsed.host, port);
    let mut stream = tokio::net::TcpStream::connect(&addr)
        .await
        .with_context(|| format!("failed to connect to {}", addr))?;

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        parsed.path, parsed.host,
    );

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    stream.write_all(request.as_bytes()).await?;
    stream.shutdown().await?;

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    let response = String::from_utf8_lossy(&buf);

    let body = response.split_once("\r\n\r\n").map(|(_, b)| b.to_string()).unwrap_or_else(|| response.to_string());
    Ok(body)
}

/// Minimal URL parser — just enough to extract host/port/path for the
/// `status` subcommand. Avoids pulling in the `url` crate for a single use.
struct MinimalUrl {
    host: String,
    port: Option<u16>,
    path: String,
}

impl std::str::FromStr for MinimalUrl {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix("http://").or_else(|| s.strip_prefix("https://")).unwrap_or(s);

        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };

        let (host, port) = match authority.rfind(':') {
            Some(i) => {
                let p = authority[i + 1..].parse::<u16>().map_err(|e| format!("bad port: {}", e))?;
                (authority[..i].to_string(), Some(p))
            }
            None => (authority.to_string(), None),
        };

        Ok(MinimalUrl { host, port, path: path.to_string() })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_is_empty_true_for_fresh_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(directory_is_empty(dir.path()));
    }

    #[test]
    fn directory_is_empty_false_after_writing_a_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker"), b"x").unwrap();
        assert!(!directory_is_empty(dir.path()));
    }

    #[test]
    fn startup_banner_does_not_panic() {
        print_startup_banner(
            &"a".repeat(64),
            "0.0.0.0:9741",
            "/home/user/.vesper",
            10_000,
        );
    }

    #[test]
    fn status_json_formatting() {
        let json_str = r#"{"version":"0.1.0","address":"abc","engine_status":"Running","block_number":42,"round":1,"synced":true,"timestamp":"2026-01-01T00:00:00Z"}"#;
        let json: serde_json::Value = serde_json::from_str(json_str).unwrap();

        assert_eq!(json["version"].as_str().unwrap(), "0.1.0");
        assert_eq!(json["block_number"].as_i64().unwrap(), 42);
        assert!(json["synced"].as_bool().unwrap());
    }

    #[test]
    fn minimal_url_parses_host_port_and_path() {
        let parsed: MinimalUrl = "http://127.0.0.1:9741/status".parse().unwrap();
        assert_eq!(parsed.host, "127.0.0.1");
        assert_eq!(parsed.port, Some(9741));
        assert_eq!(parsed.path, "/status");
    }
}
