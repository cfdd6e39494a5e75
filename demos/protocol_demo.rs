//! Interactive CLI demo of the Vesper consensus core lifecycle.
//!
//! Walks through validator identity generation, node bootstrap, stake
//! registration, proposer election, multi-round block production, and
//! chain validation. The output uses ANSI escape codes for colored,
//! storytelling-style terminal rendering.
//!
//! Run with:
//!   cargo run --bin protocol_demo --release

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use vesper_consensus::config::NodeConfig;
use vesper_consensus::crypto::keys::ValidatorKeypair;
use vesper_consensus::network::transport::{ConsensusMessage, NodeView, TransportOut};
use vesper_consensus::network::{ConsensusEngine, Mempool};
use vesper_consensus::storage::block::Block;
use vesper_consensus::storage::reconstructor::Reconstructor;
use vesper_consensus::storage::validate_chain_from_genesis;
use vesper_consensus::transaction::{Operation, Transaction, TransactionBuilder, TransactionKind};

// ---------------------------------------------------------------------------
// ANSI color constants
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const ITALIC: &str = "\x1b[3m";

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const MAGENTA: &str = "\x1b[35m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

const BG_BLUE: &str = "\x1b[44m";

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

fn banner() {
    println!();
    println!("{BG_BLUE}{BOLD}{WHITE}                                                                    {RESET}");
    println!("{BG_BLUE}{BOLD}{WHITE}    VESPER CONSENSUS  --  Interactive Lifecycle Demo               {RESET}");
    println!("{BG_BLUE}{BOLD}{WHITE}    Version 0.1.0  |  Ed25519 + BLAKE3 + Stake-Weighted PoS        {RESET}");
    println!("{BG_BLUE}{BOLD}{WHITE}                                                                    {RESET}");
    println!();
}

fn section(num: u32, title: &str) {
    println!();
    println!("{BOLD}{CYAN}===[{YELLOW} Step {num} {CYAN}]=============================================================={RESET}");
    println!("{BOLD}{WHITE}  {title}{RESET}");
    println!("{CYAN}------------------------------------------------------------------------{RESET}");
}

fn subsection(text: &str) {
    println!("{DIM}{CYAN}  >> {text}{RESET}");
}

fn success(text: &str) {
    println!("{GREEN}  [OK] {text}{RESET}");
}

fn info(label: &str, value: &str) {
    println!("{WHITE}  {BOLD}{label}:{RESET} {YELLOW}{value}{RESET}");
}

fn timing(label: &str, elapsed: std::time::Duration) {
    let ms = elapsed.as_secs_f64() * 1000.0;
    println!("{DIM}{MAGENTA}  [{label}: {ms:.2} ms]{RESET}");
}

fn address_display(name: &str, addr: &str, color: &str) {
    let prefix = &addr[..5];
    let suffix = &addr[addr.len().saturating_sub(8)..];
    println!(
        "  {color}{BOLD}{name}{RESET}  {DIM}{prefix}...{suffix}{RESET}  {DIM}({} chars){RESET}",
        addr.len()
    );
}

fn stake_row(name: &str, stake: u64, color: &str) {
    println!("  {color}{BOLD}{name:<12}{RESET}  {WHITE}{stake:>12}{RESET} {DIM}stake{RESET}");
}

fn separator() {
    println!("{DIM}{CYAN}  . . . . . . . . . . . . . . . . . . . . . . . . . . . . . . . . . {RESET}");
}

// ---------------------------------------------------------------------------
// Demo harness: a single-validator node driven directly, without a socket
// transport. Mirrors the harness used by the crate's own integration tests.
// ---------------------------------------------------------------------------

struct DemoNode {
    reconstructor: Mutex<Reconstructor>,
    mempool: Mempool,
    address: String,
}

impl NodeView for DemoNode {
    fn reconstructor(&self) -> &Mutex<Reconstructor> {
        &self.reconstructor
    }
    fn mempool(&self) -> &Mempool {
        &self.mempool
    }
    fn local_address(&self) -> &str {
        &self.address
    }
}

struct LoggingTransport {
    node: Arc<DemoNode>,
}

impl TransportOut for LoggingTransport {
    fn broadcast_consensus_message(&self, _message: &ConsensusMessage) {
        // A real deployment fans this out over the gossip network; the demo
        // has no peers to fan out to.
    }
    fn execute_and_broadcast_transaction(&self, transaction: &Transaction, _kind: TransactionKind) {
        let _ = self.node.mempool.insert(transaction.clone());
    }
    fn execute_transaction(&self, transaction: &Transaction, _kind: TransactionKind) {
        let _ = self
            .node
            .reconstructor
            .lock()
            .live_db()
            .execute_transaction_list(std::slice::from_ref(transaction));
    }
    fn request_chain_subsection(&self, _reference_block: &Block) {}
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    let demo_start = Instant::now();

    banner();

    // -----------------------------------------------------------------------
    // Step 1: Validator Identity Generation
    // -----------------------------------------------------------------------

    section(1, "Validator Identity Generation");
    subsection("Generating Ed25519 keypairs and deriving BLAKE3 addresses...");

    let t = Instant::now();
    let local_kp = ValidatorKeypair::generate();
    timing("keygen", t.elapsed());

    let local_addr = local_kp.address();

    println!();
    address_display("Local validator", &local_addr, BLUE);
    println!();
    success("Address derived from the BLAKE3 hash of the Ed25519 public key");

    // -----------------------------------------------------------------------
    // Step 2: Node Bootstrap
    // -----------------------------------------------------------------------

    section(2, "Node Bootstrap");
    subsection("Initializing reconstructor (block store + live/snapshot DBs) and mempool...");

    let t = Instant::now();
    let dir = tempfile::tempdir().expect("temporary directory");
    let reconstructor = Reconstructor::init(dir.path(), true, local_addr.clone()).expect("reconstructor init");
    let node = Arc::new(DemoNode {
        reconstructor: Mutex::new(reconstructor),
        mempool: Mempool::new(10_000),
        address: local_addr.clone(),
    });
    let transport = Arc::new(LoggingTransport { node: node.clone() });

    let config = NodeConfig { stake: 5_000, ..NodeConfig::default() };
    let engine = ConsensusEngine::new(config, node.clone() as Arc<dyn NodeView>, transport.clone());
    timing("bootstrap", t.elapsed());

    let genesis_number = node.reconstructor.lock().block_store.last_block_number();
    info("Genesis block number", &genesis_number.to_string());
    success("Genesis block present; reconstructor ready");

    // -----------------------------------------------------------------------
    // Step 3: Engine Initialization and Stake Registration
    // -----------------------------------------------------------------------

    section(3, "Engine Initialization and Stake Registration");
    subsection("Bringing the engine to Running and registering configured stake...");

    let t = Instant::now();
    engine.init().await.expect("engine init");
    timing("init", t.elapsed());

    info("Engine status", &format!("{:?}", engine.status()));
    println!();
    stake_row("Local validator", 5_000, BLUE);
    println!();
    success("Stake deposit transaction queued during initialization");

    // -----------------------------------------------------------------------
    // Step 4: Submit a Pending Transaction
    // -----------------------------------------------------------------------

    section(4, "Mempool Submission");
    subsection("Building and submitting an application transaction to the mempool...");

    let t = Instant::now();
    let app_tx = TransactionBuilder::new(local_addr.clone())
        .operation(Operation::set_value("/app/greeting", serde_json::json!("hello from vesper")))
        .nonce(0)
        .skip_verif(true)
        .build();
    node.mempool.insert(app_tx.clone()).expect("mempool insert");
    timing("build + submit", t.elapsed());

    info("Transaction id", &app_tx.id);
    info("Mempool size", &node.mempool.get_valid_transactions().len().to_string());
    success("Transaction pending inclusion in the next proposal");

    // -----------------------------------------------------------------------
    // Step 5: Proposer Election and Block Production
    // -----------------------------------------------------------------------

    section(5, "Proposer Election and Block Production");
    subsection("Sampling the stake-weighted proposer and assembling a block...");

    let t = Instant::now();
    let proposer = engine.select_proposer().expect("select proposer").expect("a proposer exists");
    timing("select_proposer", t.elapsed());
    info("Elected proposer", &proposer);

    let t = Instant::now();
    let block = engine.create_block_proposal().expect("create block proposal");
    timing("create_block_proposal", t.elapsed());

    info("Block number", &block.number.to_string());
    info("Transactions in block", &block.transactions.len().to_string());
    info("Block hash", &block.hash[..16]);

    subsection("Delivering the proposal to handle_consensus_message (self-accept)...");
    let t = Instant::now();
    engine.handle_consensus_message(ConsensusMessage::Propose(block.clone())).await;
    timing("handle_consensus_message", t.elapsed());

    let committed_height = node.reconstructor.lock().block_store.last_block_number();
    assert_eq!(committed_height, 1);
    success("Block #1 committed");

    // -----------------------------------------------------------------------
    // Step 6: A Second Round
    // -----------------------------------------------------------------------

    section(6, "A Second Consensus Round");
    subsection("Electing a proposer and producing block #2 over the new chain tip...");

    let t = Instant::now();
    let block2 = engine.create_block_proposal().expect("create block proposal");
    engine.handle_consensus_message(ConsensusMessage::Propose(block2.clone())).await;
    timing("round 2", t.elapsed());

    let committed_height = node.reconstructor.lock().block_store.last_block_number();
    info("Chain height", &committed_height.to_string());
    separator();
    success("Block #2 committed; validator set carried forward from block #1");

    // -----------------------------------------------------------------------
    // Step 7: Chain Validation
    // -----------------------------------------------------------------------

    section(7, "Chain Integrity Verification");
    subsection("Validating the full chain from genesis...");

    let t = Instant::now();
    let section_blocks = node.reconstructor.lock().block_store.get_chain_section(0, committed_height + 1);
    let genesis = Block::genesis();
    let valid = validate_chain_from_genesis(&section_blocks, &genesis);
    timing("chain validation", t.elapsed());

    assert!(valid, "chain failed validation");
    for b in &section_blocks {
        println!(
            "  {GREEN}[VALID]{RESET} Block #{} -> hash {DIM}{}...{RESET}",
            b.number,
            &b.hash[..16]
        );
    }
    success("Chain validated from genesis through the current tip");

    // -----------------------------------------------------------------------
    // Final Summary
    // -----------------------------------------------------------------------

    let total_elapsed = demo_start.elapsed();

    println!();
    println!("{BG_BLUE}{BOLD}{WHITE}                                                                    {RESET}");
    println!("{BG_BLUE}{BOLD}{WHITE}    DEMO COMPLETE -- Final Summary                                  {RESET}");
    println!("{BG_BLUE}{BOLD}{WHITE}                                                                    {RESET}");
    println!();

    println!("  {BOLD}{WHITE}Protocol Statistics:{RESET}");
    println!("  {DIM}----------------------------------------------{RESET}");
    info("Validators", "1 (local)");
    info("Blocks produced", "2 (+ genesis)");
    info("Transactions executed", "1 application + stake deposits");
    info("Signing algorithm", "Ed25519 (ed25519-dalek)");
    info("Hash function", "BLAKE3 (block hashing and proposer sampling)");
    info("Address format", "64-char lowercase hex (BLAKE3 of public key)");
    info("Consensus model", "Stake-weighted single-proposal PoS, no BFT voting phase");
    println!();

    println!(
        "  {BOLD}{GREEN}Total demo time: {:.2}s{RESET}",
        total_elapsed.as_secs_f64()
    );
    println!();
}
