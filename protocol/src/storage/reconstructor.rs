//! # Node State Reconstructor
//!
//! Rebuilds the live key/value view from (a) a snapshot DB of blocks aged
//! out of memory, (b) the Block Store's in-memory window, and (c) pending
//! pool transactions (§4.3). Also owns the local account's nonce tracker.
//!
//! The pending pool lives in the `network` module, which itself depends on
//! `storage` — to avoid a cyclic crate dependency, this module only depends
//! on a narrow [`PendingPool`] capability trait, the same pattern used for
//! `TransportOut`/`NodeView` at the network boundary (see Design Note on
//! cyclic ownership).

use std::path::Path;

use crate::transaction::{Operation, Transaction, TransactionBuilder};

use super::block::Block;
use super::block_store::{BlockStore, BlockStoreError};
use super::db::{DbError, StateDb};

/// Read-only access to the currently-valid pending transactions, supplied
/// by the mempool.
pub trait PendingPool {
    fn valid_transactions(&self) -> Vec<Transaction>;
}

#[derive(Debug, thiserror::Error)]
pub enum ReconstructorError {
    #[error(transparent)]
    BlockStore(#[from] BlockStoreError),
    #[error(transparent)]
    Db(#[from] DbError),
}

pub type ReconstructorResult<T> = Result<T, ReconstructorError>;

pub struct Reconstructor {
    pub block_store: BlockStore,
    snapshot_db: StateDb,
    live_db: StateDb,
    local_account: String,
    local_nonce: i64,
}

impl Reconstructor {
    /// Initializes the block store, binds a fresh snapshot DB, and computes
    /// the local account's initial nonce by scanning the in-memory chain
    /// newest to oldest: `max(nonce) + 1` over transactions whose `address`
    /// matches `local_account` and whose `nonce >= 0`, or `0` if none.
    pub fn init(
        directory: impl AsRef<Path>,
        is_first_node: bool,
        local_account: impl Into<String>,
    ) -> ReconstructorResult<Self> {
        let block_store = BlockStore::init(directory, is_first_node)?;
        let snapshot_db = StateDb::open_temporary()?;
        let live_db = StateDb::open_temporary()?;
        let local_account = local_account.into();
        let local_nonce = compute_initial_nonce(&block_store, &local_account);

        Ok(Self {
            block_store,
            snapshot_db,
            live_db,
            local_account,
            local_nonce,
        })
    }

    pub fn live_db(&self) -> &StateDb {
        &self.live_db
    }

    pub fn snapshot_db(&self) -> &StateDb {
        &self.snapshot_db
    }

    pub fn local_nonce(&self) -> i64 {
        self.local_nonce
    }

    /// Copies the snapshot DB into the live DB, replays every in-memory
    /// block's transactions in order, then replays all currently-valid pool
    /// transactions. Idempotent: repeated calls with no intervening
    /// mutation produce the same live-DB contents.
    pub fn reconstruct(&self, pool: &dyn PendingPool) -> ReconstructorResult<()> {
        self.live_db.set_db_to_snapshot(&self.snapshot_db)?;
        for block in self.block_store.in_memory_blocks() {
            self.live_db.execute_transaction_list(&block.transactions)?;
        }
        self.live_db.execute_transaction_list(&pool.valid_transactions())?;
        Ok(())
    }

    /// Delegates append to the block store; on success, runs `on_appended`
    /// (the caller's pool cleanup, e.g. `cleanUpForNewBlock`/
    /// `updateNonceTrackers`) and only then reconstructs, so `reconstruct`
    /// replays `pool.valid_transactions()` against a pool that has already
    /// dropped whatever the committed block superseded. Without this
    /// ordering a stale pool transaction could be replayed into `live_db`
    /// on the very block that superseded it.
    ///
    /// Sequences append -> cleanup -> reconstruct, returning whether the
    /// append itself succeeded. `on_appended` does not run on a rejected
    /// append.
    pub fn add_new_block(
        &mut self,
        block: Block,
        pool: &dyn PendingPool,
        on_appended: impl FnOnce(),
    ) -> ReconstructorResult<bool> {
        let appended = self.block_store.add_new_block(block, &self.snapshot_db);
        if appended {
            on_appended();
            self.reconstruct(pool)?;
        }
        Ok(appended)
    }

    /// Builds one transaction. Non-nonced transactions get `nonce = -1`;
    /// nonced ones get the next local nonce, which is incremented. An
    /// `address_override` bypasses the local account and disables
    /// signature verification downstream (`skip_verif = true`).
    pub fn create_transaction(
        &mut self,
        operation: Operation,
        is_nonced_transaction: bool,
        address_override: Option<String>,
        timestamp: u64,
    ) -> Transaction {
        let skip_verif = address_override.is_some();
        let address = address_override.unwrap_or_else(|| self.local_account.clone());

        let mut builder = TransactionBuilder::new(address)
            .operation(operation)
            .timestamp(timestamp)
            .skip_verif(skip_verif);

        if is_nonced_transaction {
            builder = builder.nonce(self.local_nonce);
            self.local_nonce += 1;
        }

        builder.build()
    }
}

fn compute_initial_nonce(block_store: &BlockStore, local_account: &str) -> i64 {
    block_store
        .in_memory_blocks()
        .rev()
        .flat_map(|b| b.transactions.iter())
        .filter(|tx| tx.address == local_account && tx.nonce >= 0)
        .map(|tx| tx.nonce)
        .max()
        .map(|max_nonce| max_nonce + 1)
        .unwrap_or(0)
}
