use thiserror::Error;
use tracing::warn;

use crate::chain::{ChainStore, ChainView};

/// The first inconsistency found while walking the chain.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ChainFault {
    #[error("block {index} stores hash {stored} but its contents hash to {computed}")]
    HashMismatch {
        index: u64,
        stored: String,
        computed: String,
    },
    #[error("block {index} does not link to the hash of its predecessor")]
    BrokenLink { index: u64 },
    #[error("block {index} could not be read: {reason}")]
    Unreadable { index: u64, reason: String },
}

impl ChainFault {
    pub fn index(&self) -> u64 {
        match self {
            Self::HashMismatch { index, .. }
            | Self::BrokenLink { index }
            | Self::Unreadable { index, .. } => *index,
        }
    }
}

/// Walks blocks `1..length` in order and returns the first fault.
///
/// Each block's hash is recomputed from its own fields before its link to the
/// previous block is checked. Genesis carries a random identifier instead of a
/// content hash and is never recomputed.
pub fn find_fault<S: ChainStore + ?Sized>(view: &ChainView<'_, S>) -> Option<ChainFault> {
    let length = view.length();
    if length <= 1 {
        return None;
    }

    let unreadable = |index: u64, err: &dyn std::fmt::Display| ChainFault::Unreadable {
        index,
        reason: err.to_string(),
    };

    let mut previous = match view.block(0) {
        Ok(block) => block,
        Err(e) => return Some(unreadable(0, &e)),
    };
    for index in 1..length {
        let current = match view.block(index) {
            Ok(block) => block,
            Err(e) => return Some(unreadable(index, &e)),
        };
        let computed = match current.compute_hash() {
            Ok(hash) => hash,
            Err(e) => return Some(unreadable(index, &e)),
        };
        if computed != current.hash {
            return Some(ChainFault::HashMismatch {
                index,
                stored: current.hash.clone(),
                computed,
            });
        }
        if current.previous_hash != previous.hash {
            return Some(ChainFault::BrokenLink { index });
        }
        previous = current;
    }
    None
}

pub fn is_valid<S: ChainStore + ?Sized>(view: &ChainView<'_, S>) -> bool {
    match find_fault(view) {
        None => true,
        Some(fault) => {
            warn!(index = fault.index(), %fault, "chain failed validation");
            false
        }
    }
}
