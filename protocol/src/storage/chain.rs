//! # Chain Validator
//!
//! Stateless predicates over a sequence of [`Block`]s. Block-level checks
//! (`validateHashes`, `Block.validateProposedBlock`) belong to a collaborator
//! outside this core's scope — what's here only checks that blocks link to
//! each other correctly and that the first block really is genesis-shaped.

use super::block::Block;

/// `true` iff every adjacent pair links correctly: `chain[i].last_hash`
/// equals the hash of `chain[i-1]`, and each block's own hash is internally
/// consistent.
pub fn validate_chain_subsection(chain: &[Block]) -> bool {
    if chain.is_empty() {
        return true;
    }
    if !chain[0].hash_is_consistent() {
        return false;
    }
    for pair in chain.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        if curr.last_hash != prev.hash {
            return false;
        }
        if curr.number != prev.number + 1 {
            return false;
        }
        if !curr.hash_is_consistent() {
            return false;
        }
    }
    true
}

/// `true` iff `chain[0]` matches `genesis` by hash and the rest of the
/// sequence passes [`validate_chain_subsection`].
pub fn validate_chain_from_genesis(chain: &[Block], genesis: &Block) -> bool {
    match chain.first() {
        Some(first) if first.hash == genesis.hash => validate_chain_subsection(chain),
        _ => false,
    }
}
