//! # Storage Module
//!
//! Durable state for a Vesper node.
//!
//! ## Architecture
//!
//! ```text
//! block.rs          — Block structure, genesis block, block hashing
//! chain.rs          — Chain Validator: stateless chain-linkage predicates
//! block_store.rs     — Block Store: zip-JSON persistence, bounded in-memory window, sync
//! db.rs              — StateDb: generic path-keyed key/value store
//! reconstructor.rs   — Node State Reconstructor: live DB rebuild, local nonce tracking
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! Transaction -> Block -> Block Store (files + window)
//!                              |
//!                      Reconstructor --(replay)--> StateDb (live)
//!                              |
//!                        StateDb (snapshot, aged-out blocks)
//! ```
//!
//! Every committed block's transactions eventually land in the live DB,
//! either directly (still in the in-memory window) or folded into the
//! snapshot DB once they age out.

pub mod block;
pub mod block_store;
pub mod chain;
pub mod db;
pub mod reconstructor;

pub use block::Block;
pub use block_store::BlockStore;
pub use chain::{validate_chain_from_genesis, validate_chain_subsection};
pub use db::StateDb;
pub use reconstructor::{PendingPool, Reconstructor};
