//! # Consensus Engine
//!
//! The proposer-election and proposal-acceptance state machine (§4.4). No
//! Byzantine vote/quorum phase exists by design (§1 Non-goals) — a height
//! is decided by exactly one accepted proposal per round, with a timeout
//! that advances the round and re-elects a proposer when no proposal
//! arrives in time.
//!
//! State machine: `Starting -> Initialized -> Running <-> Stopped`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, trace, warn};

use crate::config::NodeConfig;
use crate::prng;
use crate::storage::block::Block;
use crate::transaction::{Operation, TransactionKind};

use super::timer::TimerService;
use super::transport::{ConsensusMessage, NodeView, TransportOut};

fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

fn push_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Lifecycle status of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Starting,
    Initialized,
    Running,
    Stopped,
}

/// The height/round currently being decided, and the proposer elected for
/// it. Rebuilt from the chain on `init`; never persisted across restarts
/// (§1 Non-goals).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusState {
    pub number: u64,
    pub round: u64,
    pub proposer: Option<String>,
}

impl Default for ConsensusState {
    fn default() -> Self {
        Self { number: 1, round: 0, proposer: None }
    }
}

/// Error taxonomy kinds (§7). Each variant's propagation policy is
/// documented on the call sites that raise it; most are recovered locally
/// and logged, not surfaced as a crash.
#[derive(Debug, thiserror::Error)]
pub enum ConsensusError {
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    #[error("stale message")]
    StaleMessage,
    #[error("future message")]
    FutureMessage,
    #[error("local state corruption: {0}")]
    LocalStateCorruption(String),
    #[error("merge rejected")]
    MergeRejection,
    #[error("transient: {0}")]
    Transient(String),
}

pub type ConsensusResult<T> = Result<T, ConsensusError>;

/// The proposer-election + proposal-acceptance engine.
///
/// Holds its own `ConsensusState` and timer exclusively (§3, Ownership); the
/// node and pending pool are reached only through the [`NodeView`] and
/// [`TransportOut`] capabilities, which breaks the engine/server/node
/// ownership cycle (Design Note, §9).
pub struct ConsensusEngine {
    config: NodeConfig,
    node: Arc<dyn NodeView>,
    transport: Arc<dyn TransportOut>,
    local_address: String,
    state: Mutex<ConsensusState>,
    status: Mutex<EngineStatus>,
    timer: TimerService,
}

impl ConsensusEngine {
    pub fn new(config: NodeConfig, node: Arc<dyn NodeView>, transport: Arc<dyn TransportOut>) -> Arc<Self> {
        let local_address = node.local_address().to_string();
        Arc::new(Self {
            config,
            node,
            transport,
            local_address,
            state: Mutex::new(ConsensusState::default()),
            status: Mutex::new(EngineStatus::Starting),
            timer: TimerService::new(),
        })
    }

    pub fn status(&self) -> EngineStatus {
        *self.status.lock()
    }

    pub fn state(&self) -> ConsensusState {
        self.state.lock().clone()
    }

    // -- Lifecycle --------------------------------------------------------

    /// Sets `state.number` from the chain tip, queries the local stake, and
    /// issues a stake deposit if configured and currently zero. Any failure
    /// rewinds status to `Starting` and propagates the error.
    pub async fn init(self: &Arc<Self>) -> ConsensusResult<()> {
        let result = self.try_init().await;
        if result.is_err() {
            *self.status.lock() = EngineStatus::Starting;
        }
        result
    }

    async fn try_init(self: &Arc<Self>) -> ConsensusResult<()> {
        let last_number = {
            let reconstructor = self.node.reconstructor().lock();
            reconstructor.block_store.last_block_number()
        };
        let number = (last_number + 1).max(0) as u64;
        {
            let mut state = self.state.lock();
            state.number = number;
            state.round = 0;
        }
        *self.status.lock() = EngineStatus::Initialized;

        let current_stake = if number == 1 {
            self.get_valid_consensus_deposit(&self.local_address)
        } else {
            self.get_stake_at_number(number, &self.local_address)?
        };

        if current_stake == 0 && self.config.stake > 0 {
            self.stake(self.config.stake);
        }

        self.start().await;
        Ok(())
    }

    /// Transitions to `Running` and kicks off the first `updateToState`.
    pub async fn start(self: &Arc<Self>) {
        *self.status.lock() = EngineStatus::Running;
        if let Err(e) = self.update_to_state().await {
            error!(error = %e, "update_to_state failed on start, rewinding to Starting");
            *self.status.lock() = EngineStatus::Starting;
        }
    }

    /// Transitions to `Stopped` and cancels the pending timer.
    /// `ConsensusState` is left intact (§5 Lifecycle).
    pub fn stop(&self) {
        *self.status.lock() = EngineStatus::Stopped;
        self.timer.cancel();
    }

    // -- Height/round advancement -----------------------------------------

    /// Advances `state` to `lastBlockNumber + 1` at round 0, re-elects a
    /// proposer, then — after a short trampoline delay meant only to flatten
    /// the call stack, not a protocol delay — attempts a proposal.
    pub fn update_to_state<'a>(
        self: &'a Arc<Self>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ConsensusResult<()>> + Send + 'a>> {
        Box::pin(async move {
            let last_number = {
                let reconstructor = self.node.reconstructor().lock();
                reconstructor.block_store.last_block_number()
            };
            let next_number = (last_number + 1).max(0) as u64;

            {
                let state = self.state.lock();
                if state.number > next_number {
                    return Err(ConsensusError::LocalStateCorruption(format!(
                        "state.number {} ahead of chain tip + 1 ({})",
                        state.number, next_number
                    )));
                }
            }

            {
                let mut state = self.state.lock();
                state.number = next_number;
                state.round = 0;
            }

            let proposer = self.select_proposer()?;
            self.state.lock().proposer = proposer;

            let engine = Arc::clone(self);
            let delay = self.config.transition_timeout();
            let fut: std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> =
                Box::pin(async move {
                    tokio::time::sleep(delay).await;
                    engine.try_propose().await;
                });
            tokio::spawn(fut);

            Ok(())
        })
    }

    // -- Proposer election --------------------------------------------------

    /// Deterministic stake-weighted proposer election (§4.4). Returns
    /// `None` when the validator set for this height is empty.
    pub fn select_proposer(&self) -> ConsensusResult<Option<String>> {
        let (number, round) = {
            let state = self.state.lock();
            (state.number, state.round)
        };

        let reconstructor = self.node.reconstructor().lock();
        let validators = self.validator_set_for(number, &reconstructor)?;
        if validators.is_empty() {
            return Ok(None);
        }

        let seed_block = if number <= self.config.max_consensus_state_db {
            reconstructor.block_store.last_block().cloned()
        } else {
            reconstructor
                .block_store
                .get_block_by_number(number - self.config.max_consensus_state_db)
        }
        .ok_or_else(|| ConsensusError::LocalStateCorruption("seed block not found".to_string()))?;

        let mut addresses: Vec<&String> = validators.keys().collect();
        addresses.sort();
        let total: u64 = validators.values().sum();

        let sample = prng::sample_for_round(&seed_block.hash, round);
        let target = sample * total as f64;

        let mut cumulative: u64 = 0;
        for address in addresses {
            cumulative += validators[address];
            if cumulative as f64 > target {
                return Ok(Some(address.clone()));
            }
        }

        warn!(number, round, "proposer election walked the full validator set without a winner");
        Ok(None)
    }

    /// The validator set used to elect a proposer for `number`: the
    /// previous block's `validators` field, or — for height 1, before any
    /// block carries a validator set — `{local: config.stake}` when staking
    /// is configured.
    fn validator_set_for(
        &self,
        number: u64,
        reconstructor: &crate::storage::reconstructor::Reconstructor,
    ) -> ConsensusResult<HashMap<String, u64>> {
        if number == 1 {
            let mut set = HashMap::new();
            if self.config.stake > 0 {
                set.insert(self.local_address.clone(), self.config.stake);
            }
            return Ok(set);
        }

        let previous = reconstructor
            .block_store
            .get_block_by_number(number - 1)
            .ok_or_else(|| ConsensusError::LocalStateCorruption(format!("missing block {}", number - 1)))?;
        Ok(previous.validators)
    }

    // -- Proposal attempt ----------------------------------------------------

    /// Arms the round timeout, then builds and submits a proposal if this
    /// node was elected; otherwise just waits.
    pub async fn try_propose(self: &Arc<Self>) {
        let (number, round, proposer) = {
            let state = self.state.lock();
            (state.number, state.round, state.proposer.clone())
        };

        self.schedule_timeout(number, round);

        if proposer.as_deref() != Some(self.local_address.as_str()) {
            return;
        }

        match self.create_block_proposal() {
            Ok(block) => {
                let message = ConsensusMessage::Propose(block);
                self.handle_consensus_message(message).await;
            }
            Err(e) => error!(error = %e, number, round, "failed to build block proposal"),
        }
    }

    /// Assembles a block proposal: pool transactions plus a consensus-update
    /// transaction recording this height's proposal (and garbage-collecting
    /// the state that just aged out of the retention window), executed
    /// locally before the block is emitted so the proposer's own DB already
    /// reflects it (§4.4).
    pub fn create_block_proposal(&self) -> ConsensusResult<Block> {
        let mut reconstructor = self.node.reconstructor().lock();
        let last_block = reconstructor
            .block_store
            .last_block()
            .cloned()
            .ok_or_else(|| ConsensusError::LocalStateCorruption("no last block".to_string()))?;

        let block_number = self.state.lock().number;
        let mut transactions = self.node.mempool().get_valid_transactions();

        let validators = self.validators_voted_for(last_block.number, &last_block.hash, &reconstructor)?;
        let total_at_stake: u64 = validators.values().sum();

        let record = serde_json::json!({
            "number": block_number,
            "validators": validators,
            "total_at_stake": total_at_stake,
            "proposer": self.local_address,
        });
        let propose_path = format!("/consensus/number/{}/propose", block_number);

        let operation = if block_number <= self.config.max_consensus_state_db {
            Operation::set_value(&propose_path, record)
        } else {
            let gc_number = block_number - self.config.max_consensus_state_db;
            Operation::batch(vec![
                Operation::set_value(&propose_path, record),
                Operation::delete(&format!("/consensus/number/{}", gc_number)),
            ])
        };

        let timestamp = now_millis();
        let consensus_tx = reconstructor.create_transaction(operation, false, None, timestamp);
        drop(reconstructor);

        // Local execution goes through the transport capability, not a
        // direct live_db call, so this is the only place the engine touches
        // the DB on a path other than read-only lookups (§6).
        self.transport.execute_transaction(&consensus_tx, TransactionKind::Chained);
        transactions.push(consensus_tx);

        Ok(Block::new(
            &last_block,
            transactions,
            self.local_address.clone(),
            validators,
            timestamp,
        ))
    }

    /// The subset of `number`'s registrants whose recorded `block_hash`
    /// matches `hash` — the prior height's canonical block as this node saw
    /// it committed.
    fn validators_voted_for(
        &self,
        number: u64,
        hash: &str,
        reconstructor: &crate::storage::reconstructor::Reconstructor,
    ) -> ConsensusResult<HashMap<String, u64>> {
        let prefix = format!("/consensus/number/{}/register/", number);
        let entries = reconstructor
            .live_db()
            .scan_prefix(&prefix)
            .map_err(|e| ConsensusError::LocalStateCorruption(e.to_string()))?;

        let mut voted = HashMap::new();
        for (path, value) in entries {
            let address = match path.rsplit('/').next() {
                Some(a) if !a.is_empty() => a,
                _ => continue,
            };
            let recorded_hash = value.get("block_hash").and_then(|v| v.as_str()).unwrap_or_default();
            if recorded_hash == hash {
                let stake = value.get("stake").and_then(|v| v.as_u64()).unwrap_or(0);
                voted.insert(address.to_string(), stake);
            }
        }
        Ok(voted)
    }

    // -- Proposal reception ---------------------------------------------------

    /// Accepts proposals only while `Running`. Drops stale messages
    /// silently, requests catch-up for future ones, and otherwise checks
    /// and commits (§4.4 decision table).
    pub async fn handle_consensus_message(self: &Arc<Self>, message: ConsensusMessage) {
        if self.status() != EngineStatus::Running {
            trace!("dropping consensus message: engine not running");
            return;
        }

        #[allow(irrefutable_let_patterns, unreachable_patterns)]
        let block = match message.clone() {
            ConsensusMessage::Propose(block) => block,
            _ => {
                warn!("dropping consensus message of unrecognized shape");
                return;
            }
        };

        let state_number = self.state.lock().number;
        if block.number < state_number {
            debug!(block_number = block.number, state_number, "stale proposal dropped");
            return;
        }
        if block.number > state_number {
            warn!(block_number = block.number, state_number, "future proposal observed, requesting catch-up");
            let reference = {
                let reconstructor = self.node.reconstructor().lock();
                reconstructor.block_store.last_block().cloned()
            };
            if let Some(reference) = reference {
                self.transport.request_chain_subsection(&reference);
            }
            self.node.reconstructor().lock().block_store.mark_desynced();
            return;
        }

        if !self.check_proposal(&block) {
            debug!(block_number = block.number, "proposal failed checkProposal, dropping");
            return;
        }

        self.commit(block).await;
        self.transport.broadcast_consensus_message(&message);
    }

    /// The block must be hash-consistent (the per-block validation rule
    /// itself lives outside this core's scope, §4.2) and must come from the
    /// address this node elected for the current round.
    fn check_proposal(&self, block: &Block) -> bool {
        if !block.hash_is_consistent() {
            return false;
        }
        let proposer = self.state.lock().proposer.clone();
        proposer.as_deref() == Some(block.proposer.as_str())
    }

    // -- Commit ---------------------------------------------------------------

    /// Appends the block, emits a registration if staked, and advances to
    /// the next height.
    pub async fn commit(self: &Arc<Self>, block: Block) {
        let appended = {
            let mut reconstructor = self.node.reconstructor().lock();
            let mempool = self.node.mempool();
            match reconstructor.add_new_block(block.clone(), mempool, || {
                mempool.clean_up_for_new_block(&block);
                mempool.update_nonce_trackers(&block);
            }) {
                Ok(appended) => appended,
                Err(e) => {
                    error!(error = %e, number = block.number, "failed to append committed block");
                    return;
                }
            }
        };

        if !appended {
            warn!(number = block.number, "addNewBlock rejected the committed block");
            return;
        }

        self.try_register(&block);

        if let Err(e) = self.update_to_state().await {
            error!(error = %e, "update_to_state failed after commit, rewinding to Starting");
            *self.status.lock() = EngineStatus::Starting;
        }
    }

    /// Emits a registration for the just-committed block using the stake
    /// recorded for this node in that block's own validator set. The spec
    /// leaves open what should happen when stake was acquired only between
    /// height n-1 and commit (§9 open question); reading directly off the
    /// committed block sidesteps the ambiguity rather than guessing at a
    /// timing the reference implementation never pins down.
    fn try_register(&self, block: &Block) {
        let local_stake = block.validators.get(&self.local_address).copied().unwrap_or(0);
        if local_stake == 0 {
            return;
        }

        let record = serde_json::json!({ "block_hash": block.hash, "stake": local_stake });
        let path = format!("/consensus/number/{}/register/{}", block.number, self.local_address);

        let mut reconstructor = self.node.reconstructor().lock();
        let tx = reconstructor.create_transaction(Operation::set_value(&path, record), false, None, now_millis());
        drop(reconstructor);

        self.transport.execute_and_broadcast_transaction(&tx, TransactionKind::Authored);
    }

    // -- Timeout ----------------------------------------------------------

    /// Advances the round and re-elects a proposer if the engine has not
    /// already moved past `(number, round)`; otherwise the firing is stale
    /// and ignored (§7, Transient).
    pub async fn handle_timeout(self: &Arc<Self>, number: u64, round: u64) {
        let is_current = {
            let state = self.state.lock();
            !(number != state.number || round < state.round)
        };
        if !is_current {
            trace!(number, round, "ignoring stale timeout firing");
            return;
        }

        self.state.lock().round = round + 1;

        match self.select_proposer() {
            Ok(proposer) => self.state.lock().proposer = proposer,
            Err(e) => {
                error!(error = %e, "re-election after timeout failed");
                return;
            }
        }

        self.try_propose().await;
    }

    /// Arms the round timer, rejecting strictly-older `(number, round)`
    /// pairs (§4.4, monotonic scheduling policy).
    fn schedule_timeout(self: &Arc<Self>, number: u64, round: u64) {
        let engine = Arc::clone(self);
        let armed = self.timer.arm(number, round, self.config.proposal_timeout(), move |n, r| {
            let engine = Arc::clone(&engine);
            async move { engine.handle_timeout(n, r).await; }
        });
        if !armed {
            trace!(number, round, "timer arm rejected: stale relative to currently-armed pair");
        }
    }

    // -- Stake & deposit helpers --------------------------------------------

    /// Reads the canonical deposit record for `address`; valid only while
    /// positive and not within `DAY_MS` of expiry.
    fn get_valid_consensus_deposit(&self, address: &str) -> u64 {
        let reconstructor = self.node.reconstructor().lock();
        let path = format!("/deposit_accounts/consensus/{}", address);
        let value = match reconstructor.live_db().get_value(&path) {
            Ok(Some(v)) => v,
            _ => return 0,
        };

        let deposit_value = value.get("value").and_then(|v| v.as_u64()).unwrap_or(0);
        let expire_at = value.get("expire_at").and_then(|v| v.as_u64()).unwrap_or(0);
        let now = now_millis();

        if deposit_value > 0 && expire_at > now + self.config.day_ms {
            deposit_value
        } else {
            0
        }
    }

    /// Reads stake from the previous block's validator set. Heights at or
    /// below 1 have no prior block to read, by definition 0. A missing
    /// previous block for `n > 1` is fatal (§7, LocalStateCorruption).
    fn get_stake_at_number(&self, number: u64, address: &str) -> ConsensusResult<u64> {
        if number <= 1 {
            return Ok(0);
        }
        let reconstructor = self.node.reconstructor().lock();
        let previous = reconstructor
            .block_store
            .get_block_by_number(number - 1)
            .ok_or_else(|| ConsensusError::LocalStateCorruption(format!("missing block {}", number - 1)))?;
        Ok(previous.validators.get(address).copied().unwrap_or(0))
    }

    /// Emits a deposit request transaction for `amount`. Non-positive
    /// amounts are ignored.
    fn stake(&self, amount: u64) {
        if amount == 0 {
            return;
        }
        let path = format!("/deposit/consensus/{}/{}/value", self.local_address, push_id());
        let mut reconstructor = self.node.reconstructor().lock();
        let tx = reconstructor.create_transaction(
            Operation::set_value(&path, serde_json::json!(amount)),
            false,
            None,
            now_millis(),
        );
        drop(reconstructor);
        self.transport.execute_and_broadcast_transaction(&tx, TransactionKind::Authored);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::ValidatorKeypair;
    use crate::storage::reconstructor::Reconstructor;
    use crate::transaction::Transaction;
    use parking_lot::Mutex as PMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    use super::super::mempool::Mempool;

    struct TestNode {
        reconstructor: PMutex<Reconstructor>,
        mempool: Mempool,
        address: String,
    }

    impl NodeView for TestNode {
        fn reconstructor(&self) -> &PMutex<Reconstructor> {
            &self.reconstructor
        }
        fn mempool(&self) -> &Mempool {
            &self.mempool
        }
        fn local_address(&self) -> &str {
            &self.address
        }
    }

    #[derive(Default)]
    struct RecordingTransport {
        broadcasts: PMutex<Vec<ConsensusMessage>>,
        catch_up_requests: AtomicUsize,
    }

    impl TransportOut for RecordingTransport {
        fn broadcast_consensus_message(&self, message: &ConsensusMessage) {
            self.broadcasts.lock().push(message.clone());
        }
        fn execute_and_broadcast_transaction(&self, _transaction: &Transaction, _kind: TransactionKind) {}
        fn execute_transaction(&self, _transaction: &Transaction, _kind: TransactionKind) {}
        fn request_chain_subsection(&self, _reference_block: &Block) {
            self.catch_up_requests.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn build_node(dir: &std::path::Path, address: &str) -> Arc<TestNode> {
        let reconstructor = Reconstructor::init(dir, true, address).unwrap();
        Arc::new(TestNode {
            reconstructor: PMutex::new(reconstructor),
            mempool: Mempool::new(1_000),
            address: address.to_string(),
        })
    }

    #[test]
    fn select_proposer_returns_some_address_for_nonempty_validator_set() {
        let dir = tempdir().unwrap();
        let keypair = ValidatorKeypair::generate();
        let address = keypair.address();
        let node = build_node(dir.path(), &address);
        let transport = Arc::new(RecordingTransport::default());
        let mut config = NodeConfig::default();
        config.stake = 0;

        let engine = ConsensusEngine::new(config, node.clone() as Arc<dyn NodeView>, transport);

        let validators: HashMap<String, u64> =
            [("a".to_string(), 100u64), ("b".to_string(), 100u64), ("c".to_string(), 100u64)]
                .into_iter()
                .collect();

        {
            let genesis = node.reconstructor.lock().block_store.last_block().cloned().unwrap();
            let block = Block::new(&genesis, vec![], "a".to_string(), validators, 0);
            let scratch_snapshot = crate::storage::db::StateDb::open_temporary().unwrap();
            node.reconstructor.lock().block_store.add_new_block(block, &scratch_snapshot);
        }

        engine.state.lock().number = 2;
        engine.state.lock().round = 0;

        let proposer = engine.select_proposer().unwrap();
        assert!(proposer.is_some());
    }

    #[test]
    fn get_stake_at_number_is_zero_below_height_two() {
        let dir = tempdir().unwrap();
        let node = build_node(dir.path(), "local");
        let transport = Arc::new(RecordingTransport::default());
        let engine = ConsensusEngine::new(NodeConfig::default(), node as Arc<dyn NodeView>, transport);
        assert_eq!(engine.get_stake_at_number(1, "local").unwrap(), 0);
    }

    #[test]
    fn check_proposal_rejects_wrong_proposer() {
        let dir = tempdir().unwrap();
        let node = build_node(dir.path(), "local");
        let transport = Arc::new(RecordingTransport::default());
        let engine = ConsensusEngine::new(NodeConfig::default(), node.clone() as Arc<dyn NodeView>, transport);

        engine.state.lock().proposer = Some("expected".to_string());

        let genesis = node.reconstructor.lock().block_store.last_block().cloned().unwrap();
        let block = Block::new(&genesis, vec![], "someone-else".to_string(), HashMap::new(), 0);
        assert!(!engine.check_proposal(&block));
    }

    #[tokio::test]
    async fn handle_timeout_advances_round() {
        let dir = tempdir().unwrap();
        let node = build_node(dir.path(), "local");
        let transport = Arc::new(RecordingTransport::default());
        let engine = ConsensusEngine::new(NodeConfig::default(), node as Arc<dyn NodeView>, transport);

        engine.state.lock().number = 1;
        engine.state.lock().round = 0;

        engine.handle_timeout(1, 0).await;
        assert_eq!(engine.state().round, 1);
    }

    #[tokio::test]
    async fn handle_timeout_ignores_stale_round() {
        let dir = tempdir().unwrap();
        let node = build_node(dir.path(), "local");
        let transport = Arc::new(RecordingTransport::default());
        let engine = ConsensusEngine::new(NodeConfig::default(), node as Arc<dyn NodeView>, transport);

        engine.state.lock().number = 1;
        engine.state.lock().round = 2;

        engine.handle_timeout(1, 0).await;
        assert_eq!(engine.state().round, 2);
    }

    #[tokio::test]
    async fn future_proposal_triggers_catch_up_request() {
        let dir = tempdir().unwrap();
        let node = build_node(dir.path(), "local");
        let transport = Arc::new(RecordingTransport::default());
        let engine = ConsensusEngine::new(NodeConfig::default(), node.clone() as Arc<dyn NodeView>, transport.clone());

        *engine.status.lock() = EngineStatus::Running;
        engine.state.lock().number = 5;

        let genesis = node.reconstructor.lock().block_store.last_block().cloned().unwrap();
        let mut future_block = Block::new(&genesis, vec![], "someone".to_string(), HashMap::new(), 0);
        future_block.number = 9;

        engine.handle_consensus_message(ConsensusMessage::Propose(future_block)).await;

        assert_eq!(transport.catch_up_requests.load(Ordering::SeqCst), 1);
        assert!(!node.reconstructor.lock().block_store.synced_after_startup());
    }

    #[tokio::test]
    async fn stale_proposal_is_dropped_without_commit() {
        let dir = tempdir().unwrap();
        let node = build_node(dir.path(), "local");
        let transport = Arc::new(RecordingTransport::default());
        let engine = ConsensusEngine::new(NodeConfig::default(), node.clone() as Arc<dyn NodeView>, transport.clone());

        *engine.status.lock() = EngineStatus::Running;
        engine.state.lock().number = 5;

        let genesis = node.reconstructor.lock().block_store.last_block().cloned().unwrap();
        let mut stale_block = Block::new(&genesis, vec![], "someone".to_string(), HashMap::new(), 0);
        stale_block.number = 1;

        engine.handle_consensus_message(ConsensusMessage::Propose(stale_block)).await;

        assert!(transport.broadcasts.lock().is_empty());
        assert_eq!(node.reconstructor.lock().block_store.last_block_number(), 0);
    }
}
