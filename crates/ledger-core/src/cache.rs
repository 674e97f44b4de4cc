use std::collections::VecDeque;
use tracing::debug;

use crate::chain::ChainStore;
use crate::error::Result;
use crate::Block;

/// Sliding window over the most recently committed blocks, oldest first.
///
/// Eviction is strict FIFO: reading a block never changes its position.
#[derive(Clone, Debug)]
pub struct RecentBlockCache {
    capacity: usize,
    blocks: VecDeque<Block>,
}

impl RecentBlockCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            blocks: VecDeque::with_capacity(capacity),
        }
    }

    /// Builds a cache holding the last `min(capacity, length)` blocks of `store`.
    pub fn load<S: ChainStore + ?Sized>(store: &S, capacity: usize) -> Result<Self> {
        let mut cache = Self::new(capacity);
        cache.load_initial(store)?;
        Ok(cache)
    }

    pub fn load_initial<S: ChainStore + ?Sized>(&mut self, store: &S) -> Result<()> {
        self.blocks.clear();
        let length = store.length();
        let start = length.saturating_sub(self.capacity as u64);
        for index in start..length {
            self.blocks.push_back(store.read_block(index)?);
        }
        debug!(start, length, "recent block cache loaded");
        Ok(())
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push_back(block);
        while self.blocks.len() > self.capacity {
            if let Some(evicted) = self.blocks.pop_front() {
                debug!(index = evicted.index, "evicted block from cache");
            }
        }
    }

    pub fn lookup(&self, index: u64) -> Option<&Block> {
        let first = self.blocks.front()?.index;
        let offset = usize::try_from(index.checked_sub(first)?).ok()?;
        match self.blocks.get(offset) {
            Some(block) if block.index == index => Some(block),
            // window is normally contiguous; fall back to a scan if it is not
            _ => self.blocks.iter().find(|b| b.index == index),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    pub fn indices(&self) -> Vec<u64> {
        self.blocks.iter().map(|b| b.index).collect()
    }
}
