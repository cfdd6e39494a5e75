//! # Transaction Module
//!
//! The Vesper state DB is a generic path-keyed key/value store, so a
//! transaction is a write against it rather than a payments primitive.
//! Every proposal record, registration, and deposit request the Consensus
//! Engine emits, as well as any higher-level application write, is
//! represented as a [`Transaction`] wrapping an [`Operation`].
//!
//! ## Architecture
//!
//! ```text
//! types.rs        — Operation, TransactionKind, Transaction
//! builder.rs       — Fluent TransactionBuilder for constructing unsigned transactions
//! signing.rs       — Transaction signing with Ed25519 keypairs
//! verification.rs  — Structural and cryptographic verification of signed transactions
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Build** — [`TransactionBuilder`] assembles the transaction fields.
//! 2. **Sign** — [`sign_transaction`] signs with the sender's keypair,
//!    unless the transaction is `skip_verif` (engine-authored).
//! 3. **Submit** — Handed to `executeAndBroadcastTransaction`/`executeTransaction`
//!    (outside this crate's scope) along with its [`TransactionKind`].
//! 4. **Verify** — [`verify_transaction`] runs before inclusion in a proposal.

pub mod builder;
pub mod signing;
pub mod types;
pub mod verification;

pub use builder::TransactionBuilder;
pub use signing::sign_transaction;
pub use types::{Operation, Transaction, TransactionKind};
pub use verification::{verify_transaction, TransactionError};
