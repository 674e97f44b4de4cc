#![allow(dead_code)]

use ledger_core::{Block, Chain, LedgerConfig};
use ledger_storage::file_store::{block_file_name, FileStore};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

pub fn create_temp_dir() -> (TempDir, PathBuf) {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("storage");
    (temp_dir, path)
}

pub fn config(cache_capacity: usize) -> LedgerConfig {
    LedgerConfig {
        mining_reward: 50,
        cache_capacity,
    }
}

pub fn open_chain(dir: &Path, cache_capacity: usize) -> Chain<FileStore> {
    let store = FileStore::init(dir).expect("Failed to init FileStore");
    Chain::open(store, config(cache_capacity)).expect("Failed to open chain")
}

/// Mines `n` empty blocks and returns them in order.
pub fn mine_blocks(chain: &mut Chain<FileStore>, n: usize) -> Vec<Block> {
    (0..n)
        .map(|_| chain.mine_once("miner").expect("Failed to mine"))
        .collect()
}

pub fn read_record(dir: &Path, index: u64) -> Block {
    let raw = fs::read_to_string(dir.join(block_file_name(index))).expect("record exists");
    serde_json::from_str(&raw).expect("record parses")
}

/// Rewrites the on-disk record of block `index` after applying `edit`.
pub fn tamper_record(dir: &Path, index: u64, edit: impl FnOnce(&mut Block)) {
    let mut block = read_record(dir, index);
    edit(&mut block);
    let json = serde_json::to_string_pretty(&block).expect("serialize");
    fs::write(dir.join(block_file_name(index)), json).expect("rewrite record");
}

pub fn remove_temp_dir(temp_dir: TempDir) {
    let path = temp_dir.path().to_path_buf();
    temp_dir.close().expect("Failed to delete temp dir");
    assert!(!path.exists(), "Storage directory should be removed");
}
