//! Transaction verification: structural checks and cryptographic validation.
//!
//! Every transaction entering the mempool or proposed in a block must pass
//! [`verify_transaction`], unless `skip_verif` is set — the engine's own
//! bookkeeping writes (proposal records, registrations, deposit requests)
//! are authored under the local address without a signature and are exempt
//! by construction (§4.3 `createTransaction`).

use thiserror::Error;

use super::types::Transaction;
use crate::crypto::keys::{Signature, ValidatorPublicKey};

/// Errors that can occur during transaction verification.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// The transaction id does not match the double-SHA-256 of its signable bytes.
    #[error("transaction id mismatch: expected {expected}, got {actual}")]
    IdMismatch { expected: String, actual: String },

    /// The transaction is not signed and does not carry `skip_verif`.
    #[error("transaction is unsigned")]
    MissingSignature,

    /// The signature is malformed (cannot be decoded from hex or wrong length).
    #[error("malformed signature: {reason}")]
    MalformedSignature { reason: String },

    /// The sender address cannot be decoded as a lowercase-hex public key.
    #[error("invalid address: {address}")]
    InvalidAddress { address: String },

    /// The Ed25519 signature does not verify against `address`.
    #[error("invalid signature: does not verify against address {address}")]
    InvalidSignature { address: String },
}

/// Verifies a transaction's id and, unless `skip_verif` is set, its
/// signature against `tx.address` treated as a hex-encoded Ed25519 public
/// key (§3 `ValidatorSet`: addresses are lowercase hex).
pub fn verify_transaction(tx: &Transaction) -> Result<(), TransactionError> {
    let expected_id = tx.compute_id();
    if expected_id != tx.id {
        return Err(TransactionError::IdMismatch {
            expected: expected_id,
            actual: tx.id.clone(),
        });
    }

    if tx.skip_verif {
        return Ok(());
    }

    let signature_hex = tx.signature.as_ref().ok_or(TransactionError::MissingSignature)?;
    let signature = Signature::from_hex(signature_hex).map_err(|e| TransactionError::MalformedSignature {
        reason: e.to_string(),
    })?;

    let public_key =
        ValidatorPublicKey::from_hex(&tx.address).map_err(|_| TransactionError::InvalidAddress {
            address: tx.address.clone(),
        })?;

    if public_key.verify(&tx.signable_bytes(), &signature) {
        Ok(())
    } else {
        Err(TransactionError::InvalidSignature {
            address: tx.address.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::ValidatorKeypair;
    use crate::transaction::builder::TransactionBuilder;
    use crate::transaction::signing::sign_transaction;
    use crate::transaction::types::Operation;
    use serde_json::json;

    #[test]
    fn valid_signed_transaction_verifies() {
        let kp = ValidatorKeypair::generate();
        let mut tx = TransactionBuilder::new(kp.address())
            .operation(Operation::set_value("/a", json!(1)))
            .nonce(0)
            .build();
        sign_transaction(&mut tx, &kp);
        assert!(verify_transaction(&tx).is_ok());
    }

    #[test]
    fn skip_verif_transaction_needs_no_signature() {
        let tx = TransactionBuilder::new("deadbeef")
            .operation(Operation::set_value("/a", json!(1)))
            .skip_verif(true)
            .build();
        assert!(verify_transaction(&tx).is_ok());
    }

    #[test]
    fn unsigned_non_skip_verif_transaction_fails() {
        let tx = TransactionBuilder::new("deadbeef")
            .operation(Operation::set_value("/a", json!(1)))
            .build();
        assert!(matches!(
            verify_transaction(&tx),
            Err(TransactionError::MissingSignature)
        ));
    }

    #[test]
    fn tampered_operation_fails_id_check() {
        let kp = ValidatorKeypair::generate();
        let mut tx = TransactionBuilder::new(kp.address())
            .operation(Operation::set_value("/a", json!(1)))
            .nonce(0)
            .build();
        sign_transaction(&mut tx, &kp);
        tx.operation = Operation::set_value("/a", json!(2));
        assert!(matches!(
            verify_transaction(&tx),
            Err(TransactionError::IdMismatch { .. })
        ));
    }

    #[test]
    fn signature_from_wrong_key_fails() {
        let kp = ValidatorKeypair::generate();
        let other = ValidatorKeypair::generate();
        let mut tx = TransactionBuilder::new(kp.address())
            .operation(Operation::set_value("/a", json!(1)))
            .nonce(0)
            .build();
        sign_transaction(&mut tx, &other);
        assert!(matches!(
            verify_transaction(&tx),
            Err(TransactionError::InvalidSignature { .. })
        ));
    }
}
