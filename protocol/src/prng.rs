//! # Deterministic Proposer-Election Sampler
//!
//! Proposer election draws exactly one sample per `(seed_block_hash, round)`
//! pair from a PRNG seeded by the string `seed_block_hash ‖ round`. The
//! original reference node links a 48-bit xor-scrambled linear congruential
//! generator (the same family `java.util.Random` uses) to produce that
//! sample. Cross-implementation determinism only requires that every honest
//! peer link the *same* algorithm — it does not require bit-compatibility
//! with that specific generator.
//!
//! This implementation links a different, simpler generator instead, and
//! documents the substitution here as required by the protocol's open
//! question on PRNG choice: one BLAKE3 hash of the seed string, with the
//! top 53 bits of the digest mapped onto `[0, 1)` the same way `f64`
//! mantissas are populated from a random bit source. A single-shot sampler
//! is the right shape here — `select_proposer` draws exactly once per
//! `(seed, round)`, it never needs a second draw from the same stream, so
//! there is no statefulness to get wrong and no need to link an external
//! PRNG crate for a single hash-to-float conversion.
//!
//! Any node that links this module for proposer election must use the same
//! protocol version as its peers; mixing generators would make nodes elect
//! different proposers for the same height and round.

/// Draws a single deterministic sample in `[0, 1)` from an arbitrary seed.
///
/// `seed` is typically `seed_block_hash ‖ round` as a UTF-8 string, matching
/// the construction in the proposer-election algorithm.
pub fn sample_unit_interval(seed: &[u8]) -> f64 {
    let digest = blake3::hash(seed);
    let bytes = digest.as_bytes();
    let high = u64::from_be_bytes(bytes[0..8].try_into().expect("8 bytes"));
    // f64 has a 53-bit mantissa; keep the top 53 bits of the hash so every
    // bit of entropy in the result actually came from the digest.
    let mantissa = high >> 11;
    (mantissa as f64) / (1u64 << 53) as f64
}

/// Convenience wrapper matching the protocol's `seed = hash ‖ round` shape.
pub fn sample_for_round(seed_block_hash: &str, round: u64) -> f64 {
    let seed = format!("{seed_block_hash}{round}");
    sample_unit_interval(seed.as_bytes())
}
