//! # Block Structure
//!
//! A block is the atomic unit the Block Store persists and the Consensus
//! Engine proposes. Computing `hash` from the other fields and validating it
//! (`validateHashes`, `Block.validateProposedBlock`) are block-level rules
//! owned by a collaborator outside this core's scope; what lives here is the
//! data shape and the one hash function the core needs internally to link
//! blocks together and to name block files.
//!
//! Per the data model, `last_hash` is the empty string exactly for genesis —
//! there is no sentinel hash value, just an empty link.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::crypto::hash::blake3_hash;
use crate::transaction::Transaction;

/// Canonical genesis block proposer address. Lowercase hex, all zeros,
/// recognizable as "nobody proposed this."
pub const GENESIS_PROPOSER: &str = "0000000000000000000000000000000000000000000000000000000000000000";

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// A block: a height, a link to its predecessor, an ordered transaction
/// list, and the proposer's view of the voted validator set at proposal
/// time (§3 `Block`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Monotone index, 0 for genesis.
    pub number: u64,
    /// Hex-encoded hash of this block.
    pub hash: String,
    /// Hex-encoded hash of the previous block. Empty string for genesis.
    pub last_hash: String,
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
    /// Ordered transactions included in this block.
    pub transactions: Vec<Transaction>,
    /// Address of the validator that proposed this block.
    pub proposer: String,
    /// The proposer's view of the voted validator set: address → stake.
    pub validators: HashMap<String, u64>,
}

impl Block {
    /// Constructs the canonical genesis block: height 0, empty `last_hash`,
    /// no transactions, no validators.
    pub fn genesis() -> Self {
        let mut block = Block {
            number: 0,
            hash: String::new(),
            last_hash: String::new(),
            timestamp: 0,
            transactions: Vec::new(),
            proposer: GENESIS_PROPOSER.to_string(),
            validators: HashMap::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// Constructs a new block extending `last_block`. The caller supplies
    /// `proposer` and `validators` (the Consensus Engine's proposer
    /// election and registrant lookup are out of this module's scope).
    pub fn new(
        last_block: &Block,
        transactions: Vec<Transaction>,
        proposer: String,
        validators: HashMap<String, u64>,
        timestamp: u64,
    ) -> Self {
        let mut block = Block {
            number: last_block.number + 1,
            hash: String::new(),
            last_hash: last_block.hash.clone(),
            timestamp,
            transactions,
            proposer,
            validators,
        };
        block.hash = block.compute_hash();
        block
    }

    /// Deterministic hash over every field except `hash` itself. Transaction
    /// order affects the hash, matching the store's "ordered" invariant.
    pub fn compute_hash(&self) -> String {
        let mut preimage = Vec::with_capacity(128);
        preimage.extend_from_slice(&self.number.to_le_bytes());
        preimage.extend_from_slice(self.last_hash.as_bytes());
        preimage.push(0x00);
        preimage.extend_from_slice(&self.timestamp.to_le_bytes());
        preimage.extend_from_slice(self.proposer.as_bytes());
        preimage.push(0x00);

        let mut validator_addrs: Vec<&String> = self.validators.keys().collect();
        validator_addrs.sort();
        for addr in validator_addrs {
            preimage.extend_from_slice(addr.as_bytes());
            preimage.extend_from_slice(&self.validators[addr].to_le_bytes());
        }

        for tx in &self.transactions {
            preimage.extend_from_slice(tx.id.as_bytes());
        }

        hex::encode(blake3_hash(&preimage))
    }

    /// `true` iff the stored hash matches the recomputed one.
    pub fn hash_is_consistent(&self) -> bool {
        self.hash == self.compute_hash()
    }

    /// `true` iff this block's shape matches a genesis block: height 0 and
    /// an empty `last_hash`. Used by cold-start and merge-acceptance checks,
    /// which must recognize a genesis-*shaped* block without assuming it is
    /// byte-identical to the local canonical genesis.
    pub fn is_genesis_shaped(&self) -> bool {
        self.number == 0 && self.last_hash.is_empty()
    }

    pub fn total_stake(&self) -> u64 {
        self.validators.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_has_empty_last_hash() {
        let genesis = Block::genesis();
        assert_eq!(genesis.number, 0);
        assert!(genesis.last_hash.is_empty());
        assert!(genesis.is_genesis_shaped());
    }

    #[test]
    fn genesis_hash_is_deterministic() {
        let a = Block::genesis();
        let b = Block::genesis();
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn new_block_links_to_parent() {
        let genesis = Block::genesis();
        let mut validators = HashMap::new();
        validators.insert("aaaa".to_string(), 100);
        let block1 = Block::new(&genesis, vec![], "aaaa".to_string(), validators, 1_000);

        assert_eq!(block1.number, 1);
        assert_eq!(block1.last_hash, genesis.hash);
        assert!(!block1.is_genesis_shaped());
    }

    #[test]
    fn tampering_breaks_hash_consistency() {
        let genesis = Block::genesis();
        let mut block = Block::new(&genesis, vec![], "aaaa".to_string(), HashMap::new(), 1_000);
        assert!(block.hash_is_consistent());
        block.timestamp += 1;
        assert!(!block.hash_is_consistent());
    }

    #[test]
    fn total_stake_sums_validators() {
        let mut validators = HashMap::new();
        validators.insert("a".to_string(), 100);
        validators.insert("b".to_string(), 250);
        let genesis = Block::genesis();
        let block = Block::new(&genesis, vec![], "a".to_string(), validators, 0);
        assert_eq!(block.total_stake(), 350);
    }

    #[test]
    fn block_serialization_roundtrip() {
        let genesis = Block::genesis();
        let json = serde_json::to_string(&genesis).expect("serialize");
        let recovered: Block = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(genesis, recovered);
    }

    #[test]
    fn hash_depends_on_validator_order_not_insertion() {
        let genesis = Block::genesis();
        let mut v1 = HashMap::new();
        v1.insert("a".to_string(), 1);
        v1.insert("b".to_string(), 2);
        let mut v2 = HashMap::new();
        v2.insert("b".to_string(), 2);
        v2.insert("a".to_string(), 1);

        let b1 = Block::new(&genesis, vec![], "a".to_string(), v1, 0);
        let b2 = Block::new(&genesis, vec![], "a".to_string(), v2, 0);
        assert_eq!(b1.hash, b2.hash);
    }
}
