//! Vec-backed store used by unit tests.

use crate::chain::ChainStore;
use crate::error::{LedgerError, Result};
use crate::{genesis_block, Block};

#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    pub(crate) blocks: Vec<Block>,
    pub(crate) fail_appends: bool,
}

impl MemoryStore {
    pub(crate) fn init() -> Self {
        Self {
            blocks: vec![genesis_block()],
            fail_appends: false,
        }
    }
}

impl ChainStore for MemoryStore {
    fn append_block(&mut self, block: &Block) -> Result<()> {
        if self.fail_appends {
            return Err(LedgerError::Backend("append disabled".to_string()));
        }
        if block.index != self.length() {
            return Err(LedgerError::OutOfOrder {
                expected: self.length(),
                got: block.index,
            });
        }
        self.blocks.push(block.clone());
        Ok(())
    }

    fn read_block(&self, index: u64) -> Result<Block> {
        self.blocks
            .get(index as usize)
            .cloned()
            .ok_or(LedgerError::NotFound(index))
    }

    fn length(&self) -> u64 {
        self.blocks.len() as u64
    }
}
