// Consensus engine benchmarks for the Vesper protocol.
//
// Covers the proposer-election sampler, stake-weighted selection over
// validator sets of varying size, block proposal assembly, and hashing.

use std::collections::HashMap;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use vesper_consensus::config::NodeConfig;
use vesper_consensus::crypto::keys::ValidatorKeypair;
use vesper_consensus::network::transport::{ConsensusMessage, NodeView, TransportOut};
use vesper_consensus::network::{ConsensusEngine, Mempool};
use vesper_consensus::prng;
use vesper_consensus::storage::block::Block;
use vesper_consensus::storage::db::StateDb;
use vesper_consensus::storage::reconstructor::Reconstructor;
use vesper_consensus::transaction::{Transaction, TransactionKind};

struct BenchNode {
    reconstructor: parking_lot::Mutex<Reconstructor>,
    mempool: Mempool,
    address: String,
}

impl NodeView for BenchNode {
    fn reconstructor(&self) -> &parking_lot::Mutex<Reconstructor> {
        &self.reconstructor
    }
    fn mempool(&self) -> &Mempool {
        &self.mempool
    }
    fn local_address(&self) -> &str {
        &self.address
    }
}

/// Deliberately a no-op, including for `execute_transaction`: these benches
/// measure proposer-election and proposal-assembly cost, not DB-write cost.
#[derive(Default)]
struct NoopTransport;

impl TransportOut for NoopTransport {
    fn broadcast_consensus_message(&self, _message: &ConsensusMessage) {}
    fn execute_and_broadcast_transaction(&self, _transaction: &Transaction, _kind: TransactionKind) {}
    fn execute_transaction(&self, _transaction: &Transaction, _kind: TransactionKind) {}
    fn request_chain_subsection(&self, _reference_block: &Block) {}
}

/// Builds an engine whose height-2 validator set has `n` entries, so
/// `select_proposer` walks a set of the requested size.
fn setup_engine(n: usize) -> std::sync::Arc<ConsensusEngine> {
    let dir = tempfile::tempdir().unwrap();
    let reconstructor = Reconstructor::init(dir.path(), true, "local").unwrap();
    let node = std::sync::Arc::new(BenchNode {
        reconstructor: parking_lot::Mutex::new(reconstructor),
        mempool: Mempool::new(1_000),
        address: "local".to_string(),
    });

    let mut validators = HashMap::new();
    for i in 0..n {
        let kp = ValidatorKeypair::generate();
        validators.insert(kp.address(), (n - i) as u64 * 1_000);
    }

    {
        let genesis = node.reconstructor.lock().block_store.last_block().cloned().unwrap();
        let block = Block::new(&genesis, vec![], "a".to_string(), validators, 0);
        let scratch = StateDb::open_temporary().unwrap();
        node.reconstructor.lock().block_store.add_new_block(block, &scratch);
    }

    let transport = std::sync::Arc::new(NoopTransport);
    ConsensusEngine::new(NodeConfig::default(), node as std::sync::Arc<dyn NodeView>, transport)
}

fn bench_sample_for_round(c: &mut Criterion) {
    c.bench_function("prng/sample_for_round", |b| {
        b.iter(|| prng::sample_for_round("deadbeefcafebabe", 7));
    });
}

fn bench_select_proposer(c: &mut Criterion) {
    let mut group = c.benchmark_group("consensus/select_proposer");

    for validator_count in [4, 16, 64, 256] {
        group.throughput(Throughput::Elements(validator_count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(validator_count),
            &validator_count,
            |b, &n| {
                b.iter_with_setup(
                    || setup_engine(n),
                    |engine| {
                        let _ = engine.select_proposer();
                    },
                );
            },
        );
    }

    group.finish();
}

fn bench_block_hash(c: &mut Criterion) {
    let genesis = Block::genesis();
    c.bench_function("block/compute_hash", |b| {
        b.iter(|| genesis.compute_hash());
    });
}

fn bench_create_block_proposal(c: &mut Criterion) {
    c.bench_function("consensus/create_block_proposal", |b| {
        b.iter_with_setup(
            || setup_engine(8),
            |engine| {
                let _ = engine.create_block_proposal();
            },
        );
    });
}

criterion_group!(
    benches,
    bench_sample_for_round,
    bench_select_proposer,
    bench_block_hash,
    bench_create_block_proposal,
);
criterion_main!(benches);
