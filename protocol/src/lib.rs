// Copyright (c) 2026 Vesper Labs. MIT License.
// See LICENSE for details.

//! # Vesper Consensus — Core Library
//!
//! The consensus core of a proof-of-stake chain: block persistence, chain
//! validation, state reconstruction, and the proposer-election state
//! machine. Transport, mempool policy, and the mutable state database are
//! deliberately kept on the other side of narrow trait boundaries — this
//! crate only needs to call them, never to implement them.
//!
//! ## Architecture
//!
//! - **crypto** — Ed25519 keys and BLAKE3/SHA-256 hashing. Don't roll your own.
//! - **config** — Protocol constants and the per-node `NodeConfig` record.
//! - **transaction** — Generic path-keyed operations and transaction envelopes.
//! - **storage** — Block, Block Store, Chain Validator, and the state database.
//! - **network** — Consensus Engine, timer service, mempool, transport/view
//!   capabilities, and the validator node that wires them together.
//! - **prng** — The documented deterministic PRNG used for proposer election.
//!
//! ## Design Philosophy
//!
//! 1. Determinism over cleverness — two honest nodes must always agree.
//! 2. No unsafe code in consensus paths.
//! 3. Every public API is documented.
//! 4. If it decides who proposes the next block, it has tests. Plural.

pub mod config;
pub mod crypto;
pub mod network;
pub mod prng;
pub mod storage;
pub mod transaction;
