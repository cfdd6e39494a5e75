//! # Block Store
//!
//! Durable, ordered sequence of blocks with random access by number and
//! hash, and a bounded in-memory window (§4.1). Each block is persisted as
//! a zip-compressed JSON file whose name encodes both the block number
//! (zero-padded for natural sort) and the block hash (for substring
//! lookup). The directory is single-writer — only the local node appends
//! to it (§5).

use std::collections::VecDeque;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::{error, warn};

use super::block::Block;
use super::chain::validate_chain_from_genesis;
use super::db::StateDb;

/// Cap on blocks returned per `requestBlockchainSection` / sync round (§6).
pub const CHAIN_SUBSECT_LENGTH: u32 = 20;

/// Number of most-recent blocks kept resident in memory; older ones live
/// only in the block files and have had their transactions folded into the
/// snapshot DB.
pub const IN_MEMORY_WINDOW: usize = 10;

/// A block section returned by [`BlockStore::request_blockchain_section`]
/// or consumed by [`BlockStore::merge`].
pub type ChainSection = Vec<Block>;

#[derive(Debug, thiserror::Error)]
pub enum BlockStoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type BlockStoreResult<T> = Result<T, BlockStoreError>;

/// Persists blocks to `directory` and keeps the newest [`IN_MEMORY_WINDOW`]
/// resident for fast access.
pub struct BlockStore {
    directory: PathBuf,
    window: VecDeque<Block>,
    /// Set once any sync response (even an empty one) has been accepted;
    /// unblocks normal participation (glossary: "synced-after-startup").
    synced_after_startup: bool,
}

impl BlockStore {
    /// Creates the directory if absent; seeds genesis if `is_first_node`;
    /// otherwise loads and validates all persisted block files, purging the
    /// directory and starting empty on any validation failure (§7: corrupt
    /// chain at startup triggers a destructive reset in favor of re-sync).
    pub fn init(directory: impl AsRef<Path>, is_first_node: bool) -> BlockStoreResult<Self> {
        let directory = directory.as_ref().to_path_buf();
        if !directory.exists() {
            fs::create_dir_all(&directory)?;
        }

        let mut store = Self {
            directory,
            window: VecDeque::new(),
            synced_after_startup: false,
        };

        if is_first_node {
            let genesis = Block::genesis();
            store.write_block_file(&genesis)?;
            store.window.push_back(genesis);
            return Ok(store);
        }

        match store.load_all_blocks() {
            Ok(blocks) if !blocks.is_empty() => {
                let genesis = Block::genesis();
                if validate_chain_from_genesis(&blocks, &genesis) {
                    let start = blocks.len().saturating_sub(IN_MEMORY_WINDOW);
                    store.window = blocks[start..].iter().cloned().collect();
                } else {
                    warn!("persisted chain failed validation at startup, purging directory");
                    store.purge_and_reset()?;
                }
            }
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "failed to load persisted blocks, purging directory");
                store.purge_and_reset()?;
            }
        }

        Ok(store)
    }

    fn purge_and_reset(&mut self) -> BlockStoreResult<()> {
        fs::remove_dir_all(&self.directory)?;
        fs::create_dir_all(&self.directory)?;
        self.window.clear();
        Ok(())
    }

    pub fn last_block(&self) -> Option<&Block> {
        self.window.back()
    }

    pub fn last_block_number(&self) -> i64 {
        self.last_block().map(|b| b.number as i64).unwrap_or(-1)
    }

    pub fn last_block_timestamp(&self) -> i64 {
        self.last_block().map(|b| b.timestamp as i64).unwrap_or(-1)
    }

    pub fn synced_after_startup(&self) -> bool {
        self.synced_after_startup
    }

    /// Flips the synced-after-startup latch back off. Called when the
    /// engine observes a future-height proposal and needs to catch up
    /// (§4.4 `handleConsensusMessage`).
    pub fn mark_desynced(&mut self) {
        self.synced_after_startup = false;
    }

    /// The resident window, oldest first. Used by the reconstructor to
    /// replay in-memory blocks onto the live DB and to compute the local
    /// account's initial nonce.
    pub fn in_memory_blocks(&self) -> impl DoubleEndedIterator<Item = &Block> {
        self.window.iter()
    }

    /// Looks up a block by number, scanning the persisted file set (the
    /// in-memory window is checked first as a fast path).
    pub fn get_block_by_number(&self, number: u64) -> Option<Block> {
        if let Some(b) = self.window.iter().find(|b| b.number == number) {
            return Some(b.clone());
        }
        self.block_files()
            .into_iter()
            .find(|f| f.number == number)
            .and_then(|f| self.read_block_file(&f.path).ok())
    }

    /// Looks up a block by hash. Substring matches against the filename's
    /// hash component are permitted, matching the reference semantics for
    /// hash-prefix lookups.
    pub fn get_block_by_hash(&self, hash: &str) -> Option<Block> {
        if let Some(b) = self.window.iter().find(|b| b.hash == hash) {
            return Some(b.clone());
        }
        self.block_files()
            .into_iter()
            .find(|f| f.hash.contains(hash) || hash.contains(f.hash.as_str()))
            .and_then(|f| self.read_block_file(&f.path).ok())
    }

    /// Appends `block` if it is the immediate successor of the current tip.
    /// Writes the compressed block file, then shifts the oldest in-memory
    /// block into `snapshot` whenever the window exceeds [`IN_MEMORY_WINDOW`].
    pub fn add_new_block(&mut self, block: Block, snapshot: &StateDb) -> bool {
        let expected = self.last_block_number() + 1;
        if block.number as i64 != expected {
            return false;
        }
        if self.write_block_file(&block).is_err() {
            return false;
        }
        self.window.push_back(block);

        while self.window.len() > IN_MEMORY_WINDOW {
            if let Some(aged_out) = self.window.pop_front() {
                if let Err(e) = snapshot.execute_transaction_list(&aged_out.transactions) {
                    error!(error = %e, number = aged_out.number, "failed to fold aged-out block into snapshot db");
                }
            }
        }
        true
    }

    /// Lists block files with `number` in `[from, to)`, naturally sorted.
    /// Negative `from` clamps to 0; `to` beyond the tip clamps to
    /// `lastBlockNumber + 1`.
    pub fn get_block_files(&self, from: i64, to: i64) -> Vec<BlockFile> {
        let from = from.max(0) as u64;
        let to = (to.max(0) as u64).min((self.last_block_number() + 1).max(0) as u64);
        let mut files = self.block_files();
        files.retain(|f| f.number >= from && f.number < to);
        files.sort_by_key(|f| f.number);
        files
    }

    pub fn get_chain_section(&self, from: i64, to: i64) -> ChainSection {
        self.get_block_files(from, to)
            .into_iter()
            .filter_map(|f| self.read_block_file(&f.path).ok())
            .collect()
    }

    /// Serves at most [`CHAIN_SUBSECT_LENGTH`] blocks starting at
    /// `ref_block.number` inclusive, per the four-case contract in §4.1.
    pub fn request_blockchain_section(&self, ref_block: &Block) -> Option<ChainSection> {
        if let Some(last) = self.last_block() {
            if ref_block.hash == last.hash {
                return Some(vec![last.clone()]);
            }
        }

        let from = ref_block.number as i64;
        let to = from + CHAIN_SUBSECT_LENGTH as i64;
        let files = self.get_block_files(from, to);

        if !files.is_empty() {
            let first = &files[0];
            if first.number > ref_block.number {
                // Files exist past ref_block's number but don't start there:
                // the first matching slot disagrees with ref_block -> fork.
                return None;
            }
            if first.number == ref_block.number && first.hash != ref_block.hash {
                return None;
            }
        }

        let section = self.get_chain_section(from, to);
        if section.is_empty() {
            None
        } else {
            Some(section)
        }
    }

    /// Attempts to extend the local chain with a received section,
    /// following the cold-start vs. warm-start rules in §4.1.
    pub fn merge(&mut self, section: ChainSection, snapshot: &StateDb) -> bool {
        if section.is_empty() {
            if !self.synced_after_startup {
                self.synced_after_startup = true;
            }
            return false;
        }

        let local_last_number = self.last_block_number();
        let section_last_number = section.last().map(|b| b.number as i64).unwrap_or(-1);
        if section_last_number <= local_last_number {
            if !self.synced_after_startup {
                self.synced_after_startup = true;
            }
            return false;
        }

        let cold_starting = self.last_block().is_none();
        let first = &section[0];

        if cold_starting {
            if !first.is_genesis_shaped() {
                return false;
            }
        } else {
            let local_last = self.last_block().unwrap();
            if first.hash != local_last.hash {
                return false;
            }
        }

        if !validate_chain_from_genesis_or_subsection(&section, cold_starting) {
            return false;
        }

        let to_append: &[Block] = if cold_starting { &section[..] } else { &section[1..] };
        for block in to_append {
            if !self.add_new_block(block.clone(), snapshot) {
                return false;
            }
        }

        self.synced_after_startup = true;
        true
    }

    // -- File helpers ---------------------------------------------------

    fn file_name(block: &Block) -> String {
        format!("{:020}_{}.json.zip", block.number, block.hash)
    }

    fn write_block_file(&self, block: &Block) -> BlockStoreResult<()> {
        let path = self.directory.join(Self::file_name(block));
        let json = serde_json::to_vec(block).map_err(|e| BlockStoreError::Serialization(e.to_string()))?;

        let file = fs::File::create(&path)?;
        let mut zip = zip::ZipWriter::new(file);
        let options =
            zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        zip.start_file("block.json", options)?;
        zip.write_all(&json)?;
        zip.finish()?;
        Ok(())
    }

    fn read_block_file(&self, path: &Path) -> BlockStoreResult<Block> {
        let file = fs::File::open(path)?;
        let mut archive = zip::ZipArchive::new(file)?;
        let mut entry = archive.by_name("block.json")?;
        let mut json = Vec::new();
        entry.read_to_end(&mut json)?;
        serde_json::from_slice(&json).map_err(|e| BlockStoreError::Serialization(e.to_string()))
    }

    fn block_files(&self) -> Vec<BlockFile> {
        let mut files: Vec<BlockFile> = walkdir::WalkDir::new(&self.directory)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter_map(|entry| BlockFile::parse(entry.path()))
            .collect();
        files.sort_by_key(|f| f.number);
        files
    }

    fn load_all_blocks(&self) -> BlockStoreResult<Vec<Block>> {
        let mut blocks = Vec::new();
        for file in self.block_files() {
            blocks.push(self.read_block_file(&file.path)?);
        }
        Ok(blocks)
    }
}

fn validate_chain_from_genesis_or_subsection(section: &[Block], cold_starting: bool) -> bool {
    if cold_starting {
        let genesis = Block::genesis();
        validate_chain_from_genesis(section, &genesis)
    } else {
        super::chain::validate_chain_subsection(section)
    }
}

/// A block file's parsed name: `{number:020}_{hash}.json.zip`.
#[derive(Debug, Clone)]
pub struct BlockFile {
    pub number: u64,
    pub hash: String,
    pub path: PathBuf,
}

impl BlockFile {
    fn parse(path: &Path) -> Option<Self> {
        let stem = path.file_name()?.to_str()?.strip_suffix(".json.zip")?;
        let (number_str, hash) = stem.split_once('_')?;
        let number = number_str.parse().ok()?;
        Some(Self {
            number,
            hash: hash.to_string(),
            path: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn chain_of(n: u64) -> Vec<Block> {
        let mut chain = vec![Block::genesis()];
        for i in 1..n {
            let last = chain.last().unwrap();
            let block = Block::new(last, vec![], "aaaa".to_string(), HashMap::new(), i);
            chain.push(block);
        }
        chain
    }

    #[test]
    fn first_node_seeds_genesis() {
        let dir = tempdir().unwrap();
        let store = BlockStore::init(dir.path(), true).unwrap();
        assert_eq!(store.last_block_number(), 0);
    }

    #[test]
    fn missing_block_returns_none() {
        let dir = tempdir().unwrap();
        let store = BlockStore::init(dir.path(), true).unwrap();
        assert!(store.get_block_by_number(99).is_none());
        assert_eq!(store.last_block_number(), 0);
    }

    #[test]
    fn add_new_block_rejects_wrong_number() {
        let dir = tempdir().unwrap();
        let mut store = BlockStore::init(dir.path(), true).unwrap();
        let snapshot = StateDb::open_temporary().unwrap();
        let genesis = store.last_block().unwrap().clone();
        let mut bad = Block::new(&genesis, vec![], "a".to_string(), HashMap::new(), 1);
        bad.number = 5;
        assert!(!store.add_new_block(bad, &snapshot));
    }

    #[test]
    fn add_new_block_accepts_successor() {
        let dir = tempdir().unwrap();
        let mut store = BlockStore::init(dir.path(), true).unwrap();
        let snapshot = StateDb::open_temporary().unwrap();
        let genesis = store.last_block().unwrap().clone();
        let block1 = Block::new(&genesis, vec![], "a".to_string(), HashMap::new(), 1);
        assert!(store.add_new_block(block1, &snapshot));
        assert_eq!(store.last_block_number(), 1);
    }

    #[test]
    fn window_never_exceeds_ten() {
        let dir = tempdir().unwrap();
        let mut store = BlockStore::init(dir.path(), true).unwrap();
        let snapshot = StateDb::open_temporary().unwrap();

        for i in 1..=15u64 {
            let last = store.last_block().unwrap().clone();
            let block = Block::new(&last, vec![], "a".to_string(), HashMap::new(), i);
            assert!(store.add_new_block(block, &snapshot));
        }
        assert_eq!(store.window.len(), IN_MEMORY_WINDOW);
        assert_eq!(store.last_block_number(), 15);
    }

    #[test]
    fn persisted_chain_reloads_after_restart() {
        let dir = tempdir().unwrap();
        {
            let mut store = BlockStore::init(dir.path(), true).unwrap();
            let snapshot = StateDb::open_temporary().unwrap();
            for i in 1..=3u64 {
                let last = store.last_block().unwrap().clone();
                let block = Block::new(&last, vec![], "a".to_string(), HashMap::new(), i);
                store.add_new_block(block, &snapshot);
            }
        }
        let reloaded = BlockStore::init(dir.path(), false).unwrap();
        assert_eq!(reloaded.last_block_number(), 3);
    }

    #[test]
    fn request_blockchain_section_acks_when_caller_is_current() {
        let dir = tempdir().unwrap();
        let store = BlockStore::init(dir.path(), true).unwrap();
        let genesis = store.last_block().unwrap().clone();
        let section = store.request_blockchain_section(&genesis).unwrap();
        assert_eq!(section.len(), 1);
        assert_eq!(section[0].hash, genesis.hash);
    }

    #[test]
    fn request_blockchain_section_rejects_fork() {
        let dir = tempdir().unwrap();
        let mut store = BlockStore::init(dir.path(), true).unwrap();
        let snapshot = StateDb::open_temporary().unwrap();
        let genesis = store.last_block().unwrap().clone();
        let block1 = Block::new(&genesis, vec![], "a".to_string(), HashMap::new(), 1);
        store.add_new_block(block1, &snapshot);

        let mut fake_genesis = Block::genesis();
        fake_genesis.proposer = "ffff".to_string();
        fake_genesis.hash = fake_genesis.compute_hash();
        let section = store.request_blockchain_section(&fake_genesis);
        assert!(section.is_none());
    }

    #[test]
    fn merge_accepts_cold_start_genesis_section() {
        let dir = tempdir().unwrap();
        let snapshot = StateDb::open_temporary().unwrap();
        let mut store = BlockStore {
            directory: dir.path().to_path_buf(),
            window: VecDeque::new(),
            synced_after_startup: false,
        };
        let section = chain_of(3);
        assert!(store.merge(section, &snapshot));
        assert_eq!(store.last_block_number(), 2);
        assert!(store.synced_after_startup());
    }

    #[test]
    fn merge_rejects_fork_on_warm_start() {
        let dir = tempdir().unwrap();
        let mut store = BlockStore::init(dir.path(), true).unwrap();
        let snapshot = StateDb::open_temporary().unwrap();

        let mut forked_genesis = Block::genesis();
        forked_genesis.proposer = "ffff".to_string();
        forked_genesis.hash = forked_genesis.compute_hash();
        let fork_block = Block::new(&forked_genesis, vec![], "a".to_string(), HashMap::new(), 1);

        let before = store.last_block_number();
        assert!(!store.merge(vec![forked_genesis, fork_block], &snapshot));
        assert_eq!(store.last_block_number(), before);
    }

    #[test]
    fn merge_rejects_section_not_ahead() {
        let dir = tempdir().unwrap();
        let mut store = BlockStore::init(dir.path(), true).unwrap();
        let snapshot = StateDb::open_temporary().unwrap();
        let genesis = store.last_block().unwrap().clone();
        assert!(!store.merge(vec![genesis], &snapshot));
    }

    #[test]
    fn empty_merge_marks_synced_on_first_attempt() {
        let dir = tempdir().unwrap();
        let mut store = BlockStore::init(dir.path(), true).unwrap();
        let snapshot = StateDb::open_temporary().unwrap();
        assert!(!store.synced_after_startup());
        assert!(!store.merge(vec![], &snapshot));
        assert!(store.synced_after_startup());
    }
}
