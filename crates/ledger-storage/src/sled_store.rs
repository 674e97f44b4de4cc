use ledger_core::{genesis_block, Block, ChainStore, LedgerError, Result};
use sled::{Db, IVec, Tree};
use std::path::Path;
use tracing::{debug, info};

const TREE_BLOCKS: &str = "blocks";
const KEY_CHAIN_LENGTH: &[u8] = b"chain_length";

/// Embedded alternative to [`crate::FileStore`]. Blocks live in their own tree
/// keyed by big-endian index; the length marker is decimal ASCII in the
/// default tree.
pub struct SledStore {
  db: Db,
  blocks: Tree,
  length: u64,
}

fn backend(e: sled::Error) -> LedgerError {
  LedgerError::Backend(e.to_string())
}

impl SledStore {
  pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
    let db = sled::open(path).map_err(backend)?;
    let blocks = db.open_tree(TREE_BLOCKS).map_err(backend)?;

    match db.get(KEY_CHAIN_LENGTH).map_err(backend)? {
      Some(raw) => {
        let length = parse_length(&raw)?;
        info!(length, "sled store opened");
        Ok(Self { db, blocks, length })
      }
      None => {
        let mut store = Self {
          db,
          blocks,
          length: 0,
        };
        let genesis = genesis_block();
        store.append_block(&genesis)?;
        info!(hash = %genesis.hash, "sled store created with genesis block");
        Ok(store)
      }
    }
  }

  pub fn close(&self) -> Result<()> {
    self.db.flush().map_err(backend)?;
    Ok(())
  }
}

fn parse_length(raw: &IVec) -> Result<u64> {
  let text = std::str::from_utf8(raw)
    .map_err(|e| LedgerError::CorruptLength(e.to_string()))?;
  let length = text
    .trim()
    .parse::<u64>()
    .map_err(|e| LedgerError::CorruptLength(format!("{text:?}: {e}")))?;
  if length == 0 {
    return Err(LedgerError::CorruptLength(
      "chain must hold at least the genesis block".to_string(),
    ));
  }
  Ok(length)
}

impl ChainStore for SledStore {
  fn append_block(&mut self, block: &Block) -> Result<()> {
    if block.index != self.length {
      return Err(LedgerError::OutOfOrder {
        expected: self.length,
        got: block.index,
      });
    }
    let bytes = bincode::serialize(block).map_err(|e| LedgerError::Backend(e.to_string()))?;
    self
      .blocks
      .insert(block.index.to_be_bytes(), bytes)
      .map_err(backend)?;
    self.blocks.flush().map_err(backend)?;

    // commit point
    let next = self.length + 1;
    self
      .db
      .insert(KEY_CHAIN_LENGTH, next.to_string().as_bytes())
      .map_err(backend)?;
    self.db.flush().map_err(backend)?;
    self.length = next;
    debug!(index = block.index, "block committed");
    Ok(())
  }

  fn read_block(&self, index: u64) -> Result<Block> {
    if index >= self.length {
      return Err(LedgerError::NotFound(index));
    }
    let raw = self
      .blocks
      .get(index.to_be_bytes())
      .map_err(backend)?
      .ok_or(LedgerError::NotFound(index))?;
    let block: Block = bincode::deserialize(&raw).map_err(|e| LedgerError::Corrupt {
      index,
      reason: e.to_string(),
    })?;
    if block.index != index {
      return Err(LedgerError::Corrupt {
        index,
        reason: format!("record holds block {}", block.index),
      });
    }
    Ok(block)
  }

  fn length(&self) -> u64 {
    self.length
  }
}
