use tracing::{debug, info};

use crate::cache::RecentBlockCache;
use crate::chain::{ChainStore, ChainView};
use crate::constants::MAX_AMOUNT;
use crate::error::{LedgerError, Result};
use crate::{now_millis, Block, CheckRequest, Transaction};

/// Holds the pending entry queues and seals them into blocks.
///
/// The queues are unbounded. Callers that accept entries from untrusted
/// sources should rate limit before submitting.
#[derive(Debug, Default)]
pub struct Miner {
    pending_transactions: Vec<Transaction>,
    pending_check_requests: Vec<CheckRequest>,
}

impl Miner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&mut self, tx: Transaction) -> Result<()> {
        if tx.from_address.as_deref().is_some_and(str::is_empty) {
            return Err(LedgerError::invalid("transaction must include a from address"));
        }
        if tx.to_address.is_empty() {
            return Err(LedgerError::invalid("transaction must include a to address"));
        }
        if tx.amount > MAX_AMOUNT {
            return Err(LedgerError::invalid(format!(
                "transaction amount exceeds the maximum of {MAX_AMOUNT}"
            )));
        }
        debug!(from = ?tx.from_address, to = %tx.to_address, amount = %tx.amount, "transaction queued");
        self.pending_transactions.push(tx);
        Ok(())
    }

    pub fn submit_check_request(&mut self, request: CheckRequest) -> Result<()> {
        if request.from_address.is_empty() {
            return Err(LedgerError::invalid("check request must include a from address"));
        }
        if request.candidate_hash.is_empty() {
            return Err(LedgerError::invalid("check request must include a candidate hash"));
        }
        debug!(from = %request.from_address, candidate = %request.candidate_hash, "check request queued");
        self.pending_check_requests.push(request);
        Ok(())
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        &self.pending_transactions
    }

    pub fn pending_check_requests(&self) -> &[CheckRequest] {
        &self.pending_check_requests
    }

    /// Seals every pending entry plus a reward mint into the next block and
    /// commits it.
    ///
    /// The queues are only cleared once the store has committed the block. On
    /// any failure they are left exactly as they were and no reward is queued.
    pub fn mine_once<S: ChainStore + ?Sized>(
        &mut self,
        store: &mut S,
        cache: &mut RecentBlockCache,
        reward_address: &str,
        reward: u128,
    ) -> Result<Block> {
        if reward_address.is_empty() {
            return Err(LedgerError::invalid("mining reward address must not be empty"));
        }
        if reward > MAX_AMOUNT {
            return Err(LedgerError::invalid("mining reward exceeds the maximum amount"));
        }

        let index = store.length();
        let tip = index.checked_sub(1).ok_or(LedgerError::NotFound(0))?;
        let previous_hash = ChainView::new(&*store, cache).block(tip)?.hash.clone();

        let mut transactions = self.pending_transactions.clone();
        transactions.push(Transaction::mint(reward_address, reward));

        let block = Block::seal(
            index,
            now_millis(),
            transactions,
            self.pending_check_requests.clone(),
            previous_hash,
        )?;
        store.append_block(&block)?;

        self.pending_transactions.clear();
        self.pending_check_requests.clear();
        cache.push(block.clone());

        info!(
            index = block.index,
            hash = %block.hash,
            txs = block.transactions.len(),
            requests = block.requests.len(),
            "mined block"
        );
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_store::MemoryStore;

    fn setup() -> (MemoryStore, RecentBlockCache, Miner) {
        let store = MemoryStore::init();
        let cache = RecentBlockCache::load(&store, 10).unwrap();
        (store, cache, Miner::new())
    }

    #[test]
    fn mining_seals_pending_entries_then_reward() {
        let (mut store, mut cache, mut miner) = setup();
        miner.submit(Transaction::transfer("a", "b", 10)).unwrap();
        miner
            .submit_check_request(CheckRequest::new("a", "cafe"))
            .unwrap();

        let block = miner.mine_once(&mut store, &mut cache, "m", 50).unwrap();

        assert_eq!(store.length(), 2);
        assert_eq!(block.index, 1);
        assert_eq!(
            block.transactions,
            vec![Transaction::transfer("a", "b", 10), Transaction::mint("m", 50)]
        );
        assert_eq!(block.requests.len(), 1);
        assert_eq!(block.requests[0].candidate_hash, "cafe");
        assert_eq!(block.previous_hash, store.blocks[0].hash);
        assert_eq!(block.compute_hash().unwrap(), block.hash);
        assert!(miner.pending_transactions().is_empty());
        assert!(miner.pending_check_requests().is_empty());
        assert_eq!(cache.lookup(1), Some(&block));
    }

    #[test]
    fn empty_cycle_still_mints_reward() {
        let (mut store, mut cache, mut miner) = setup();
        let block = miner.mine_once(&mut store, &mut cache, "m", 50).unwrap();
        assert_eq!(block.transactions, vec![Transaction::mint("m", 50)]);
        assert!(block.requests.is_empty());
    }

    #[test]
    fn failed_commit_leaves_queues_intact() {
        let (mut store, mut cache, mut miner) = setup();
        miner.submit(Transaction::transfer("a", "b", 10)).unwrap();
        miner
            .submit_check_request(CheckRequest::new("a", "cafe"))
            .unwrap();
        store.fail_appends = true;

        assert!(miner.mine_once(&mut store, &mut cache, "m", 50).is_err());
        assert_eq!(store.length(), 1);
        assert_eq!(miner.pending_transactions(), &[Transaction::transfer("a", "b", 10)]);
        assert_eq!(miner.pending_check_requests().len(), 1);
        assert!(cache.lookup(1).is_none());

        store.fail_appends = false;
        let block = miner.mine_once(&mut store, &mut cache, "m", 50).unwrap();
        // a single reward, not one per attempt
        assert_eq!(block.transactions.len(), 2);
    }

    #[test]
    fn rejects_malformed_entries() {
        let mut miner = Miner::new();
        let missing_from = Transaction::transfer("", "b", 1);
        let missing_to = Transaction::transfer("a", "", 1);
        assert!(matches!(miner.submit(missing_from), Err(LedgerError::InvalidInput(_))));
        assert!(matches!(miner.submit(missing_to), Err(LedgerError::InvalidInput(_))));
        assert!(matches!(
            miner.submit_check_request(CheckRequest::new("", "cafe")),
            Err(LedgerError::InvalidInput(_))
        ));
        assert!(matches!(
            miner.submit_check_request(CheckRequest::new("a", "")),
            Err(LedgerError::InvalidInput(_))
        ));
        assert!(miner.pending_transactions().is_empty());
        assert!(miner.pending_check_requests().is_empty());
    }

    #[test]
    fn amounts_beyond_signed_range_are_rejected() {
        let mut miner = Miner::new();
        let too_large = Transaction::transfer("a", "b", MAX_AMOUNT + 1);
        assert!(matches!(miner.submit(too_large), Err(LedgerError::InvalidInput(_))));
        assert!(miner.pending_transactions().is_empty());

        miner.submit(Transaction::transfer("a", "b", MAX_AMOUNT)).unwrap();
        assert_eq!(miner.pending_transactions().len(), 1);

        let (mut store, mut cache, _) = setup();
        assert!(matches!(
            miner.mine_once(&mut store, &mut cache, "m", MAX_AMOUNT + 1),
            Err(LedgerError::InvalidInput(_))
        ));
        assert_eq!(store.length(), 1);
    }

    #[test]
    fn explicit_mint_is_accepted() {
        let mut miner = Miner::new();
        miner.submit(Transaction::mint("x", 100)).unwrap();
        assert_eq!(miner.pending_transactions().len(), 1);
    }

    #[test]
    fn chained_blocks_link_through_cache_and_store() {
        let store = MemoryStore::init();
        // capacity 1 forces the tip lookup to hit the cache only for the newest block
        let mut cache = RecentBlockCache::load(&store, 1).unwrap();
        let mut store = store;
        let mut miner = Miner::new();
        let mut previous = store.blocks[0].hash.clone();
        for i in 1..5 {
            let block = miner.mine_once(&mut store, &mut cache, "m", 50).unwrap();
            assert_eq!(block.index, i);
            assert_eq!(block.previous_hash, previous);
            previous = block.hash;
        }
        assert_eq!(cache.indices(), vec![4]);
    }
}
