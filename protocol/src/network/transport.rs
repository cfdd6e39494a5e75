//! # Transport & Node Capabilities
//!
//! The engine calls back into two collaborators it does not own: the
//! transport/server layer and the node that holds it. Modeled as two
//! capability traits (Design Note, §9) so the engine can be constructed and
//! tested without a real P2P stack or a real node wrapper:
//!
//! - [`TransportOut`]: the four outbound operations the engine is allowed to
//!   invoke on the server (§6). Calls are fire-and-forget from the engine's
//!   perspective (§5, suspension point (c)).
//! - [`NodeView`]: the node's owned resources the engine needs — the
//!   reconstructor (which in turn owns the block store and both state DBs),
//!   the pending pool, and the local account address.

use parking_lot::Mutex;

use crate::storage::reconstructor::Reconstructor;
use crate::storage::Block;
use crate::transaction::{Transaction, TransactionKind};

use super::mempool::Mempool;

/// The set of consensus messages a peer can send. Currently only carries a
/// block proposal; modeled as a sum type so future phases (votes,
/// registrations-as-messages) can be added without breaking exhaustive
/// matches at call sites (Design Note, §9).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum ConsensusMessage {
    #[serde(rename = "PROPOSE")]
    Propose(Block),
}

/// Outbound operations the engine invokes on the transport/server layer.
/// Implementations own the actual networking; the engine only needs to
/// start the call and move on.
pub trait TransportOut: Send + Sync {
    fn broadcast_consensus_message(&self, message: &ConsensusMessage);
    fn execute_and_broadcast_transaction(&self, transaction: &Transaction, kind: TransactionKind);
    fn execute_transaction(&self, transaction: &Transaction, kind: TransactionKind);
    fn request_chain_subsection(&self, reference_block: &Block);
}

/// Read/write access to the node's owned resources, handed to the engine as
/// a capability so the engine never needs to know about the node's own
/// lifecycle or peer set.
pub trait NodeView: Send + Sync {
    fn reconstructor(&self) -> &Mutex<Reconstructor>;
    fn mempool(&self) -> &Mempool;
    fn local_address(&self) -> &str;
}
