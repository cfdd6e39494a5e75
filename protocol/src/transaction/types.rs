//! Core type definitions for Vesper transactions.
//!
//! Unlike a payments chain, Vesper's state DB is a generic path-keyed
//! key/value store (see `/consensus/number/<n>/propose`-style paths in the
//! data model). A transaction is therefore not "transfer X from A to B" but
//! "write `value` at `path`", optionally batched. [`Operation`] is that
//! vocabulary; [`Transaction`] wraps one with the envelope consensus and the
//! reconstructor need (address, nonce, signature).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::hash::double_sha256;

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// A single state mutation against the path-keyed DB.
///
/// `SetValue` is the atomic primitive every other construct reduces to; `Set`
/// batches a list of them so a proposal's consensus-update transaction can
/// carry both the new proposal record and the garbage-collection delete of
/// an aged-out one as a single indivisible write (§4.4, `createBlockProposal`
/// step 5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Operation {
    /// Write `value` at `path`. A `value` of `serde_json::Value::Null` is a
    /// delete — this is how the engine garbage-collects aged-out consensus
    /// records.
    SetValue { path: String, value: serde_json::Value },
    /// Apply every operation in `ops`, in order, as one unit.
    Set { ops: Vec<Operation> },
}

impl Operation {
    pub fn set_value(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self::SetValue { path: path.into(), value }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::SetValue { path: path.into(), value: serde_json::Value::Null }
    }

    pub fn batch(ops: Vec<Operation>) -> Self {
        Self::Set { ops }
    }

    /// Flattens nested `Set` batches into their leaf `SetValue` operations,
    /// in application order.
    pub fn flatten(&self) -> Vec<(&str, &serde_json::Value)> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into<'a>(&'a self, out: &mut Vec<(&'a str, &'a serde_json::Value)>) {
        match self {
            Self::SetValue { path, value } => out.push((path.as_str(), value)),
            Self::Set { ops } => {
                for op in ops {
                    op.flatten_into(out);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// TransactionKind
// ---------------------------------------------------------------------------

/// Distinguishes a transaction newly authored by this node from one being
/// replayed because it arrived embedded in a block. `executeTransaction` and
/// `executeAndBroadcastTransaction` both take a `kind` parameter (§6) so the
/// DB layer can apply kind-specific bookkeeping (e.g. local nonce tracking
/// only advances for `Authored` transactions from the local account).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Constructed locally by this node (via `createTransaction`) and not
    /// yet part of any block.
    Authored,
    /// Arrived embedded in a block (local proposal or a peer's), or is being
    /// replayed during state reconstruction.
    Chained,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authored => write!(f, "Authored"),
            Self::Chained => write!(f, "Chained"),
        }
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// An envelope around an [`Operation`] carrying the identity and ordering
/// information the reconstructor and consensus engine need.
///
/// `nonce == -1` marks a non-nonced transaction (§4.3 `createTransaction`):
/// these are not subject to per-account ordering and are typically emitted
/// by the engine itself (proposal records, registrations) rather than by an
/// end user. `skip_verif` is set when `data.address` was supplied by the
/// caller as an override rather than derived from a signing key, which
/// disables signature verification downstream — this is how the engine can
/// author transactions under the local address without needing to involve a
/// keypair for every internal bookkeeping write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Deterministic id: `hex(double_sha256(signable_bytes))`.
    pub id: String,
    /// Address this transaction is attributed to.
    pub address: String,
    /// Per-account sequence number, or `-1` for non-nonced transactions.
    pub nonce: i64,
    /// The state mutation this transaction performs.
    pub operation: Operation,
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
    /// Hex-encoded Ed25519 signature over `signable_bytes`. `None` until
    /// signed, and never populated for `skip_verif` transactions.
    pub signature: Option<String>,
    /// When `true`, signature verification is bypassed for this
    /// transaction. Set only when `address` was an explicit override
    /// rather than derived from a signing keypair.
    pub skip_verif: bool,
}

impl Transaction {
    /// Canonical bytes used for signing and id computation. Deliberately
    /// avoids JSON: field order must be stable across serde implementations
    /// and serde_json does not guarantee map key order for `Operation`'s
    /// nested `serde_json::Value` payloads.
    pub fn signable_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(128);
        buf.extend_from_slice(self.address.as_bytes());
        buf.push(0x00);
        buf.extend_from_slice(&self.nonce.to_le_bytes());
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        for (path, value) in self.operation.flatten() {
            buf.extend_from_slice(path.as_bytes());
            buf.push(0x00);
            buf.extend_from_slice(value.to_string().as_bytes());
            buf.push(0x00);
        }
        buf
    }

    pub fn compute_id(&self) -> String {
        hex::encode(double_sha256(&self.signable_bytes()))
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some() || self.skip_verif
    }

    pub fn is_nonced(&self) -> bool {
        self.nonce >= 0
    }
}
