use clap::{Parser, ValueEnum};
use ledger_core::constants::{DEFAULT_CACHE_CAPACITY, DEFAULT_MINING_REWARD};
use ledger_core::LedgerConfig;
use std::time::Duration;

use crate::constants::DEFAULT_REWARD_ADDRESS;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// One JSON file per block plus `chain-length.txt`
    File,
    /// Embedded sled database
    Sled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "ledger-node")]
#[command(about = "Single-writer hash-linked ledger node")]
pub struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long, env = "LEDGER_LISTEN", default_value = "127.0.0.1:8080")]
    pub listen: String,

    /// Storage directory
    #[arg(long, env = "LEDGER_DATA_DIR", default_value = "./storage")]
    pub data_dir: String,

    #[arg(long, env = "LEDGER_BACKEND", value_enum, default_value_t = Backend::File)]
    pub backend: Backend,

    /// Seconds between mining cycles
    #[arg(long, env = "LEDGER_MINING_INTERVAL_SECS", default_value_t = 10)]
    pub mining_interval_secs: u64,

    /// Amount minted to the reward address each cycle
    #[arg(long, env = "LEDGER_MINING_REWARD", default_value_t = DEFAULT_MINING_REWARD)]
    pub mining_reward: u128,

    #[arg(long, env = "LEDGER_REWARD_ADDRESS", default_value = DEFAULT_REWARD_ADDRESS)]
    pub reward_address: String,

    /// Number of recent blocks kept in memory
    #[arg(long, env = "LEDGER_CACHE_CAPACITY", default_value_t = DEFAULT_CACHE_CAPACITY)]
    pub cache_capacity: usize,

    #[arg(long, env = "LEDGER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Args {
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            mining_reward: self.mining_reward,
            cache_capacity: self.cache_capacity,
        }
    }

    pub fn mining_interval(&self) -> Duration {
        Duration::from_secs(self.mining_interval_secs.max(1))
    }
}
