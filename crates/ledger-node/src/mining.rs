use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info};

use crate::actor::{LedgerEvent, LedgerHandle};

/// Periodic mining trigger. Each cycle waits for the previous commit to
/// return before the next tick is taken, and ticks missed while a cycle runs
/// are skipped rather than fired back to back.
pub async fn run(handle: LedgerHandle, reward_address: String, period: Duration) {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // the first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        match handle.mine(&reward_address).await {
            Ok(block) => {
                let (index, hash) = (block.index, block.hash.clone());
                let listeners = handle.publish(LedgerEvent::Block(block));
                info!(index, hash = %hash, listeners, "new block broadcast");
            }
            Err(e) => error!(error = %e, "mining cycle failed"),
        }
    }
}
