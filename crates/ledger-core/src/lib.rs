pub mod balance;
pub mod block;
pub mod cache;
pub mod chain;
pub mod constants;
pub mod error;
pub mod miner;
pub mod validator;

#[cfg(test)]
mod test_store;

pub use block::{canonical_hash, genesis_block, now_millis, Block, CheckRequest, Transaction};
pub use cache::RecentBlockCache;
pub use chain::{Chain, ChainStore, ChainView, LedgerConfig};
pub use constants::{GENESIS_ADDRESS, GENESIS_SUPPLY, MAX_AMOUNT, ROOT_HASH};
pub use error::{LedgerError, Result};
pub use miner::Miner;
pub use validator::ChainFault;
