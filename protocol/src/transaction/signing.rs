//! Transaction signing with Ed25519 keypairs.
//!
//! Signing is a separate step from building because the keypair may not be
//! available at construction time, and because `skip_verif` transactions
//! (engine-authored bookkeeping writes) are never signed at all.

use super::types::Transaction;
use crate::crypto::keys::ValidatorKeypair;

/// Signs a transaction in place using the provided keypair.
///
/// Does nothing to `skip_verif` transactions beyond leaving `signature` as
/// `None` — callers should not sign those. The caller is responsible for
/// ensuring `keypair` matches `tx.address`.
pub fn sign_transaction<'a>(tx: &'a mut Transaction, keypair: &ValidatorKeypair) -> &'a Transaction {
    let signable = tx.signable_bytes();
    let signature = keypair.sign(&signable);
    tx.signature = Some(signature.to_hex());
    tx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::builder::TransactionBuilder;
    use crate::transaction::types::Operation;
    use serde_json::json;

    #[test]
    fn sign_sets_signature_field() {
        let kp = ValidatorKeypair::generate();
        let mut tx = TransactionBuilder::new(kp.address())
            .operation(Operation::set_value("/a", json!(1)))
            .nonce(0)
            .build();

        assert!(!tx.is_signed());
        sign_transaction(&mut tx, &kp);
        assert!(tx.is_signed());
    }

    #[test]
    fn signature_is_128_hex_chars() {
        let kp = ValidatorKeypair::generate();
        let mut tx = TransactionBuilder::new(kp.address())
            .operation(Operation::set_value("/a", json!(1)))
            .nonce(0)
            .build();
        sign_transaction(&mut tx, &kp);
        assert_eq!(tx.signature.unwrap().len(), 128);
    }

    #[test]
    fn signing_does_not_change_id() {
        let kp = ValidatorKeypair::generate();
        let mut tx = TransactionBuilder::new(kp.address())
            .operation(Operation::set_value("/a", json!(1)))
            .nonce(0)
            .build();
        let id_before = tx.id.clone();
        sign_transaction(&mut tx, &kp);
        assert_eq!(tx.id, id_before);
    }
}
