//! Transaction construction via the builder pattern.
//!
//! The [`TransactionBuilder`] enforces a disciplined construction flow: set
//! the required fields, call `.build()`, and get back an unsigned
//! [`Transaction`] with a deterministic id derived from its contents.
//!
//! The builder does not sign — that happens in [`super::signing`]. This
//! separation keeps construction testable without key material, and matches
//! the Node State Reconstructor's `createTransaction(data, isNoncedTransaction)`
//! contract: nonce assignment is the caller's decision, not the builder's.

use super::types::{Operation, Transaction};

/// Builds a [`Transaction`] one field at a time.
///
/// `nonce` defaults to `-1` (non-nonced); call [`TransactionBuilder::nonce`]
/// to opt into per-account sequencing.
pub struct TransactionBuilder {
    address: String,
    nonce: i64,
    operation: Option<Operation>,
    timestamp: u64,
    skip_verif: bool,
}

impl TransactionBuilder {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            nonce: -1,
            operation: None,
            timestamp: 0,
            skip_verif: false,
        }
    }

    pub fn operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn nonce(mut self, nonce: i64) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Marks the transaction as address-overridden: the caller asserts this
    /// transaction is authored on behalf of `address` without a signature,
    /// disabling downstream signature verification (§4.3).
    pub fn skip_verif(mut self, skip_verif: bool) -> Self {
        self.skip_verif = skip_verif;
        self
    }

    pub fn build(self) -> Transaction {
        let operation = self
            .operation
            .expect("TransactionBuilder::build called without an operation");
        let mut tx = Transaction {
            id: String::new(),
            address: self.address,
            nonce: self.nonce,
            operation,
            timestamp: self.timestamp,
            signature: None,
            skip_verif: self.skip_verif,
        };
        tx.id = tx.compute_id();
        tx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_nonce_is_non_nonced() {
        let tx = TransactionBuilder::new("abcd")
            .operation(Operation::set_value("/a", json!(1)))
            .build();
        assert_eq!(tx.nonce, -1);
    }

    #[test]
    fn explicit_nonce_is_kept() {
        let tx = TransactionBuilder::new("abcd")
            .operation(Operation::set_value("/a", json!(1)))
            .nonce(7)
            .build();
        assert_eq!(tx.nonce, 7);
    }

    #[test]
    fn id_is_populated_on_build() {
        let tx = TransactionBuilder::new("abcd")
            .operation(Operation::set_value("/a", json!(1)))
            .build();
        assert!(!tx.id.is_empty());
    }

    #[test]
    #[should_panic]
    fn build_without_operation_panics() {
        let _ = TransactionBuilder::new("abcd").build();
    }
}
