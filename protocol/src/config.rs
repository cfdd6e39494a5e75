//! # Protocol Configuration & Constants
//!
//! Network identity and timing constants that every validator must agree on,
//! plus [`NodeConfig`], the per-node knobs that can differ across validators
//! without breaking consensus (stake, ports, timeouts, storage limits).

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Network Identifiers
// ---------------------------------------------------------------------------

/// Mainnet network id.
pub const NETWORK_ID_MAINNET: u32 = 0x56455350; // "VESP"

/// Testnet network id.
pub const NETWORK_ID_TESTNET: u32 = 0x56455354; // "VEST"

/// Devnet network id.
pub const NETWORK_ID_DEVNET: u32 = 0x56455344; // "VESD"

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Major version — bump on breaking consensus changes.
pub const PROTOCOL_VERSION_MAJOR: u16 = 0;

/// Minor version — bump on backward-compatible additions.
pub const PROTOCOL_VERSION_MINOR: u16 = 1;

/// Patch version — bump on non-consensus bug fixes.
pub const PROTOCOL_VERSION_PATCH: u16 = 0;

/// The full version string.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Signing key length in bytes. Ed25519 secret keys are 32 bytes.
pub const SIGNING_KEY_LENGTH: usize = 32;

/// Public (verifying) key length in bytes.
pub const VERIFYING_KEY_LENGTH: usize = 32;

/// Ed25519 signature length. Always 64 bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// Hash output length in bytes. Both SHA-256 and BLAKE3 produce 32-byte digests.
pub const HASH_OUTPUT_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Consensus Timing
// ---------------------------------------------------------------------------

/// Milliseconds in a day, used to bound how far a block's declared timestamp
/// may drift from wall-clock time before it is rejected as malformed.
pub const DAY_MS: u64 = 86_400_000;

/// How long the Consensus Engine waits, after entering a round without
/// receiving (or producing) a valid proposal, before it advances to the
/// next round with an incremented round number.
pub const TRANSITION_TIMEOUT_MS: u64 = 10_000;

/// How long a node that believes it is the proposer for `(number, round)`
/// waits for its own proposal to be constructed and broadcast before giving
/// up and falling back to the round-advance path.
pub const PROPOSAL_TIMEOUT_MS: u64 = 3_000;

/// Default chain-subsection length requested during sync.
pub const DEFAULT_CHAIN_SUBSECT_LENGTH: u32 = 20;

/// Default number of most-recent blocks kept resident in memory by the
/// Block Store; older blocks live only in the on-disk snapshot DB.
pub const DEFAULT_IN_MEMORY_WINDOW: usize = 10;

/// Default cap (in tree entries) on how large the live consensus-state
/// database is allowed to grow before the node refuses new writes and
/// surfaces a `LocalStateCorruption`-adjacent operational warning.
pub const DEFAULT_MAX_CONSENSUS_STATE_DB: u64 = 10_000_000;

/// Returns `TRANSITION_TIMEOUT_MS`/`PROPOSAL_TIMEOUT_MS` as [`Duration`]s for
/// callers that want to hand them straight to `tokio::time::sleep`.
pub fn transition_timeout() -> Duration {
    Duration::from_millis(TRANSITION_TIMEOUT_MS)
}

pub fn proposal_timeout() -> Duration {
    Duration::from_millis(PROPOSAL_TIMEOUT_MS)
}

// ---------------------------------------------------------------------------
// Per-node configuration
// ---------------------------------------------------------------------------

/// The knobs that distinguish one validator's runtime from another's.
///
/// Unlike the constants above, these are *not* required to match across the
/// network — `stake` and `account_index` are this node's own identity, and
/// the rest are local operational limits. They're grouped into one record so
/// a single `clap::Args` derive produces the whole CLI surface at once.
#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct NodeConfig {
    /// This validator's stake weight, used when it appears in a block's
    /// `validators` map. Ignored for non-validating (observer) nodes.
    #[arg(long, env = "VESPER_STAKE", default_value_t = 0)]
    pub stake: u64,

    /// Selects a pre-generated key-pair by index (see
    /// [`crate::crypto::keys::ValidatorKeypair::from_account_index`]). If
    /// absent, a fresh key-pair is generated on startup and not persisted.
    #[arg(long, env = "VESPER_ACCOUNT_INDEX")]
    pub account_index: Option<u32>,

    /// HTTP port for the node's status/metrics surface.
    #[arg(long, env = "VESPER_PORT", default_value_t = 9741)]
    pub port: u16,

    /// Cap on the live consensus-state database's entry count.
    #[arg(long, env = "VESPER_MAX_CONSENSUS_STATE_DB", default_value_t = DEFAULT_MAX_CONSENSUS_STATE_DB)]
    pub max_consensus_state_db: u64,

    /// Round-advance timeout, in milliseconds.
    #[arg(long, env = "VESPER_TRANSITION_TIMEOUT_MS", default_value_t = TRANSITION_TIMEOUT_MS)]
    pub transition_timeout_ms: u64,

    /// Self-proposal timeout, in milliseconds.
    #[arg(long, env = "VESPER_PROPOSAL_TIMEOUT_MS", default_value_t = PROPOSAL_TIMEOUT_MS)]
    pub proposal_timeout_ms: u64,

    /// Maximum accepted drift between a block's declared timestamp and this
    /// node's wall clock, in milliseconds. Defaults to one day.
    #[arg(long, env = "VESPER_DAY_MS", default_value_t = DAY_MS)]
    pub day_ms: u64,

    /// Number of blocks requested per chain-subsection sync round.
    #[arg(long, env = "VESPER_CHAIN_SUBSECT_LENGTH", default_value_t = DEFAULT_CHAIN_SUBSECT_LENGTH)]
    pub chain_subsect_length: u32,

    /// Number of most-recent blocks kept in memory by the Block Store.
    #[arg(long, env = "VESPER_IN_MEMORY_WINDOW", default_value_t = DEFAULT_IN_MEMORY_WINDOW)]
    pub in_memory_window: usize,
}

impl NodeConfig {
    /// This node's configured round-advance timeout as a [`Duration`].
    pub fn transition_timeout(&self) -> Duration {
        Duration::from_millis(self.transition_timeout_ms)
    }

    /// This node's configured self-proposal timeout as a [`Duration`].
    pub fn proposal_timeout(&self) -> Duration {
        Duration::from_millis(self.proposal_timeout_ms)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            stake: 0,
            account_index: None,
            port: 9741,
            max_consensus_state_db: DEFAULT_MAX_CONSENSUS_STATE_DB,
            transition_timeout_ms: TRANSITION_TIMEOUT_MS,
            proposal_timeout_ms: PROPOSAL_TIMEOUT_MS,
            day_ms: DAY_MS,
            chain_subsect_length: DEFAULT_CHAIN_SUBSECT_LENGTH,
            in_memory_window: DEFAULT_IN_MEMORY_WINDOW,
        }
    }
}

// ---------------------------------------------------------------------------
// Utility
// ---------------------------------------------------------------------------

/// Returns a friendly name for a network ID, mainly for logging.
pub fn network_name(network_id: u32) -> String {
    match network_id {
        NETWORK_ID_MAINNET => "mainnet".to_string(),
        NETWORK_ID_TESTNET => "testnet".to_string(),
        NETWORK_ID_DEVNET => "devnet".to_string(),
        other => format!("unknown(0x{:08X})", other),
    }
}
