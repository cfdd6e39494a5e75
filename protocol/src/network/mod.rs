//! # Network Module
//!
//! The Consensus Engine and its immediate collaborators: the node that owns
//! durable state, the pending transaction pool, the round timeout service,
//! and the capability traits that keep the engine from needing to know
//! about the transport/server layer directly.
//!
//! ## Architecture
//!
//! ```text
//! node.rs       — ValidatorNode: owns the reconstructor and pending pool
//! consensus.rs  — ConsensusEngine: proposer election + proposal acceptance
//! mempool.rs    — Pending transaction pool (getValidTransactions/cleanUpForNewBlock/updateNonceTrackers)
//! timer.rs      — Single-slot, monotonic round timeout service
//! transport.rs  — ConsensusMessage, TransportOut and NodeView capability traits
//! ```
//!
//! ## Design Decisions
//!
//! - No BFT vote/quorum phase exists: a height is decided by exactly one
//!   accepted proposal per round, matching the Non-goals in scope for this
//!   core (finality voting, cross-restart consensus-round persistence, and
//!   fork reconciliation beyond longest-chain-at-sync-time are all
//!   explicitly out of scope).
//! - The engine never touches sockets. It calls four methods on
//!   `TransportOut` and leaves delivery entirely to the implementor.
//! - `parking_lot::Mutex` guards both the engine's own state and the node's
//!   reconstructor/mempool, matching the single-logical-executor model: at
//!   most one message or timeout is being handled at a time, so the lock is
//!   never contended in practice — it exists for `Send + Sync`, not for
//!   throughput.

pub mod consensus;
pub mod mempool;
pub mod node;
pub mod timer;
pub mod transport;

pub use consensus::{ConsensusEngine, ConsensusError, ConsensusState, EngineStatus};
pub use mempool::Mempool;
pub use node::{NodeError, ValidatorNode};
pub use timer::TimerService;
pub use transport::{ConsensusMessage, NodeView, TransportOut};
