//! # Mempool
//!
//! The consensus core only consumes three operations on the pending
//! transaction pool (§1): `getValidTransactions()`, `cleanUpForNewBlock()`,
//! and `updateNonceTrackers()`. Everything else about admission policy,
//! fee ordering, or eviction under load is this module's concern and not
//! the core's.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::storage::block::Block;
use crate::storage::reconstructor::PendingPool;
use crate::transaction::Transaction;

/// A thread-safe transaction mempool.
#[derive(Debug)]
pub struct Mempool {
    txs: RwLock<HashMap<String, Transaction>>,
    max_size: usize,
}

impl Mempool {
    pub fn new(max_size: usize) -> Self {
        Self {
            txs: RwLock::new(HashMap::new()),
            max_size,
        }
    }

    /// Inserts a transaction into the mempool. Returns an error if the
    /// mempool is at capacity.
    pub fn insert(&self, tx: Transaction) -> Result<(), String> {
        let mut txs = self.txs.write();
        if txs.len() >= self.max_size {
            return Err("mempool is full".to_string());
        }
        txs.insert(tx.id.clone(), tx);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.txs.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.txs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.read().is_empty()
    }

    /// The read contract the Consensus Engine calls when assembling a
    /// proposal (§4.4 `createBlockProposal` step 2).
    pub fn get_valid_transactions(&self) -> Vec<Transaction> {
        self.txs.read().values().cloned().collect()
    }

    /// Drops every transaction that a just-committed block already
    /// includes, by id.
    pub fn clean_up_for_new_block(&self, block: &Block) {
        let mut txs = self.txs.write();
        for committed in &block.transactions {
            txs.remove(&committed.id);
        }
    }

    /// Drops pool transactions superseded by the committed block: any
    /// pending transaction from an address that appears in the block with a
    /// nonce less than or equal to the committed nonce for that address is
    /// stale and must be discarded to avoid double-application on replay.
    pub fn update_nonce_trackers(&self, block: &Block) {
        let mut committed_nonce: HashMap<&str, i64> = HashMap::new();
        for tx in &block.transactions {
            if tx.nonce >= 0 {
                let entry = committed_nonce.entry(tx.address.as_str()).or_insert(tx.nonce);
                if tx.nonce > *entry {
                    *entry = tx.nonce;
                }
            }
        }

        let mut txs = self.txs.write();
        txs.retain(|_, tx| {
            match committed_nonce.get(tx.address.as_str()) {
                Some(&max_committed) if tx.nonce >= 0 => tx.nonce > max_committed,
                _ => true,
            }
        });
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl PendingPool for Mempool {
    fn valid_transactions(&self) -> Vec<Transaction> {
        self.get_valid_transactions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{Operation, TransactionBuilder};
    use serde_json::json;
    use std::collections::HashMap as StdHashMap;

    fn tx(address: &str, nonce: i64) -> Transaction {
        TransactionBuilder::new(address)
            .operation(Operation::set_value("/a", json!(1)))
            .nonce(nonce)
            .skip_verif(true)
            .build()
    }

    #[test]
    fn insert_and_len() {
        let pool = Mempool::new(10);
        pool.insert(tx("a", 0)).unwrap();
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn insert_rejects_when_full() {
        let pool = Mempool::new(1);
        pool.insert(tx("a", 0)).unwrap();
        assert!(pool.insert(tx("b", 0)).is_err());
    }

    #[test]
    fn clean_up_for_new_block_removes_committed_txs() {
        let pool = Mempool::new(10);
        let t = tx("a", 0);
        pool.insert(t.clone()).unwrap();

        let genesis = crate::storage::block::Block::genesis();
        let block = crate::storage::block::Block::new(&genesis, vec![t], "a".to_string(), StdHashMap::new(), 0);
        pool.clean_up_for_new_block(&block);
        assert!(pool.is_empty());
    }

    #[test]
    fn update_nonce_trackers_drops_superseded_pending_txs() {
        let pool = Mempool::new(10);
        pool.insert(tx("a", 5)).unwrap();

        let genesis = crate::storage::block::Block::genesis();
        let committed = tx("a", 5);
        let block = crate::storage::block::Block::new(&genesis, vec![committed], "a".to_string(), StdHashMap::new(), 0);
        pool.update_nonce_trackers(&block);
        assert!(pool.is_empty());
    }

    #[test]
    fn update_nonce_trackers_keeps_future_nonces() {
        let pool = Mempool::new(10);
        pool.insert(tx("a", 6)).unwrap();

        let genesis = crate::storage::block::Block::genesis();
        let committed = tx("a", 5);
        let block = crate::storage::block::Block::new(&genesis, vec![committed], "a".to_string(), StdHashMap::new(), 0);
        pool.update_nonce_trackers(&block);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn pending_pool_trait_exposes_valid_transactions() {
        let pool = Mempool::new(10);
        pool.insert(tx("a", 0)).unwrap();
        let via_trait: &dyn PendingPool = &pool;
        assert_eq!(via_trait.valid_transactions().len(), 1);
    }
}
