use rayon::prelude::*;

use crate::chain::{ChainStore, ChainView};
use crate::error::Result;
use crate::Block;

/// Net balance of `address` over every committed block.
///
/// There is no balance index: each call reads the whole chain. Blocks are
/// scanned in parallel since the sum does not depend on order.
pub fn balance_of<S: ChainStore + ?Sized>(view: &ChainView<'_, S>, address: &str) -> Result<i128> {
    (0..view.length())
        .into_par_iter()
        .map(|index| view.block(index).map(|block| net_flow(&block, address)))
        .try_reduce(|| 0, |a, b| Ok(a.saturating_add(b)))
}

/// Credits minus debits of `address` within one block. A transfer to self
/// nets to zero.
pub fn net_flow(block: &Block, address: &str) -> i128 {
    block.transactions.iter().fold(0i128, |acc, tx| {
        let amount = i128::try_from(tx.amount).unwrap_or(i128::MAX);
        let mut acc = acc;
        if tx.from_address.as_deref() == Some(address) {
            acc = acc.saturating_sub(amount);
        }
        if tx.to_address == address {
            acc = acc.saturating_add(amount);
        }
        acc
    })
}
