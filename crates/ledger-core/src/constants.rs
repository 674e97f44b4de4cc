pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const GENESIS_ID_SIZE: usize = 16;
pub const ROOT_HASH: &str = "0";
pub const GENESIS_ADDRESS: &str = "ERC20BRIDGE";
pub const GENESIS_SUPPLY: u128 = 100_000_000_000_000_000_000_000_000;
pub const DEFAULT_MINING_REWARD: u128 = 50;
pub const DEFAULT_CACHE_CAPACITY: usize = 100;
/// Largest amount a single transaction may carry. Balances are signed, so an
/// amount must fit in `i128`.
pub const MAX_AMOUNT: u128 = i128::MAX as u128;
