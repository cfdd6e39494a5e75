//! # Cryptographic Primitives
//!
//! Block and transaction hashing rules live outside this crate (they are
//! a collaborator's concern per the core's scope). What lives here is the
//! minimum the consensus core cannot delegate: validator identity.
//!
//! - **Ed25519** for validator signatures.
//! - **BLAKE3** for general-purpose hashing (seed derivation, address
//!   derivation helpers used by tests and benches).
//! - **SHA-256** kept for call sites that need it for cross-system
//!   compatibility.

pub mod hash;
pub mod keys;

pub use hash::{blake3_hash, double_sha256, sha256};
pub use keys::{Signature, ValidatorKeypair, ValidatorPublicKey};
