//! # Validator Node
//!
//! The node owns the resources the Consensus Engine borrows through the
//! [`NodeView`] capability: the reconstructor (which in turn owns the block
//! store and both state DBs) and the pending pool (§3, Ownership — "the
//! Node owns the DB handles and hands read-only views to the engine").

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::config::NodeConfig;
use crate::crypto::keys::ValidatorKeypair;
use crate::storage::reconstructor::{Reconstructor, ReconstructorError};

use super::mempool::Mempool;
use super::transport::NodeView;

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error(transparent)]
    Reconstructor(#[from] ReconstructorError),
}

/// A single node's owned state: identity, reconstructor (block store + live
/// and snapshot DBs), and pending pool.
pub struct ValidatorNode {
    keypair: ValidatorKeypair,
    local_address: String,
    reconstructor: Mutex<Reconstructor>,
    mempool: Mempool,
}

impl ValidatorNode {
    /// Loads or generates a keypair per `config.account_index`, then
    /// initializes the reconstructor (and through it, the block store)
    /// under `directory`.
    pub fn init(
        directory: impl AsRef<Path>,
        config: &NodeConfig,
        is_first_node: bool,
    ) -> Result<Arc<Self>, NodeError> {
        let keypair = match config.account_index {
            Some(index) => ValidatorKeypair::from_account_index(index),
            None => ValidatorKeypair::generate(),
        };
        let local_address = keypair.address();

        info!(address = %local_address, is_first_node, "initializing validator node");

        let reconstructor = Reconstructor::init(directory, is_first_node, local_address.clone())?;
        let mempool = Mempool::new(10_000);

        Ok(Arc::new(Self {
            keypair,
            local_address,
            reconstructor: Mutex::new(reconstructor),
            mempool,
        }))
    }

    pub fn keypair(&self) -> &ValidatorKeypair {
        &self.keypair
    }

    pub fn address(&self) -> &str {
        &self.local_address
    }
}

impl NodeView for ValidatorNode {
    fn reconstructor(&self) -> &Mutex<Reconstructor> {
        &self.reconstructor
    }

    fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    fn local_address(&self) -> &str {
        &self.local_address
    }
}
