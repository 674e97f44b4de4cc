use std::borrow::Cow;
use tracing::info;

use crate::balance;
use crate::cache::RecentBlockCache;
use crate::constants::{DEFAULT_CACHE_CAPACITY, DEFAULT_MINING_REWARD};
use crate::error::{LedgerError, Result};
use crate::miner::Miner;
use crate::validator::{self, ChainFault};
use crate::{Block, CheckRequest, Transaction};

/// Durable block records plus the chain length marker.
///
/// This lives in `ledger-core` so the storage crate can depend on it without a
/// cycle. Implementations must treat the length update as the commit point of
/// [`ChainStore::append_block`]: a record written past `length()` does not
/// exist as far as readers are concerned.
pub trait ChainStore: Send + Sync {
    /// Persists `block` at index `length()` and then advances the length.
    fn append_block(&mut self, block: &Block) -> Result<()>;

    /// Reads a committed block. `NotFound` past the tip or for a missing
    /// record, `Corrupt` for a record that does not decode.
    fn read_block(&self, index: u64) -> Result<Block>;

    /// Number of committed blocks, genesis included.
    fn length(&self) -> u64;
}

impl<T: ChainStore + ?Sized> ChainStore for Box<T> {
    fn append_block(&mut self, block: &Block) -> Result<()> {
        (**self).append_block(block)
    }

    fn read_block(&self, index: u64) -> Result<Block> {
        (**self).read_block(index)
    }

    fn length(&self) -> u64 {
        (**self).length()
    }
}

/// Read access that consults the recent-block cache before the store.
pub struct ChainView<'a, S: ?Sized> {
    store: &'a S,
    cache: &'a RecentBlockCache,
}

impl<'a, S: ChainStore + ?Sized> ChainView<'a, S> {
    pub fn new(store: &'a S, cache: &'a RecentBlockCache) -> Self {
        Self { store, cache }
    }

    pub fn length(&self) -> u64 {
        self.store.length()
    }

    pub fn block(&self, index: u64) -> Result<Cow<'a, Block>> {
        match self.cache.lookup(index) {
            Some(block) => Ok(Cow::Borrowed(block)),
            None => self.store.read_block(index).map(Cow::Owned),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LedgerConfig {
    /// Amount minted to the reward address on every mining cycle.
    pub mining_reward: u128,
    pub cache_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            mining_reward: DEFAULT_MINING_REWARD,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Single-writer ledger: a store, its recent-block cache, and the miner
/// holding pending entries.
///
/// Every mutating method takes `&mut self`, so submissions and mining cycles
/// are serialized by whoever owns the `Chain`.
pub struct Chain<S: ChainStore> {
    store: S,
    cache: RecentBlockCache,
    miner: Miner,
    config: LedgerConfig,
}

impl<S: ChainStore> Chain<S> {
    /// Wraps an initialized store and warms the cache from it.
    pub fn open(store: S, config: LedgerConfig) -> Result<Self> {
        let cache = RecentBlockCache::load(&store, config.cache_capacity)?;
        info!(
            length = store.length(),
            cached = cache.len(),
            "chain opened"
        );
        Ok(Self {
            store,
            cache,
            miner: Miner::new(),
            config,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn cache(&self) -> &RecentBlockCache {
        &self.cache
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn view(&self) -> ChainView<'_, S> {
        ChainView::new(&self.store, &self.cache)
    }

    pub fn length(&self) -> u64 {
        self.store.length()
    }

    pub fn block(&self, index: u64) -> Result<Block> {
        self.view().block(index).map(Cow::into_owned)
    }

    pub fn last_block(&self) -> Result<Block> {
        let tip = self
            .length()
            .checked_sub(1)
            .ok_or(LedgerError::NotFound(0))?;
        self.block(tip)
    }

    pub fn submit(&mut self, tx: Transaction) -> Result<()> {
        self.miner.submit(tx)
    }

    pub fn submit_check_request(&mut self, request: CheckRequest) -> Result<()> {
        self.miner.submit_check_request(request)
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        self.miner.pending_transactions()
    }

    pub fn pending_check_requests(&self) -> &[CheckRequest] {
        self.miner.pending_check_requests()
    }

    pub fn mine_once(&mut self, reward_address: &str) -> Result<Block> {
        self.miner.mine_once(
            &mut self.store,
            &mut self.cache,
            reward_address,
            self.config.mining_reward,
        )
    }

    pub fn is_valid(&self) -> bool {
        validator::is_valid(&self.view())
    }

    pub fn find_fault(&self) -> Option<ChainFault> {
        validator::find_fault(&self.view())
    }

    pub fn balance_of(&self, address: &str) -> Result<i128> {
        balance::balance_of(&self.view(), address)
    }
}
