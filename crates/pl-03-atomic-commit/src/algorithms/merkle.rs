//! # State Root Computation
//!
//! Binary Merkle tree over the account state, sorted by account id.
//!
//! - Leaf: `SHA-256(0x00 || len(account) || account || balance_be)`
//! - Node: `SHA-256(0x01 || left || right)`
//! - An odd node at the end of a level is promoted unchanged
//! - The empty state hashes to [`EMPTY_ROOT`]
//!
//! Leaf hashing is the expensive part and runs on rayon once the state is
//! large enough.

use rayon::prelude::*;
use sha2::{Digest, Sha256};
use shared_types::{AccountId, Balance, BalanceSheet, Hash};

/// Root of an empty account state.
pub const EMPTY_ROOT: Hash = [0u8; 32];

/// Below this many accounts leaves are hashed sequentially.
pub const PARALLEL_LEAF_THRESHOLD: usize = 256;

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

/// Hash one `(account, balance)` leaf.
pub fn hash_leaf(account: &AccountId, balance: Balance) -> Hash {
    let id = account.as_str().as_bytes();
    let mut hasher = Sha256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update((id.len() as u64).to_be_bytes());
    hasher.update(id);
    hasher.update(balance.to_be_bytes());
    hasher.finalize().into()
}

fn hash_node(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([NODE_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Compute the state root. `BalanceSheet` iteration is already sorted.
pub fn compute_state_root(state: &BalanceSheet) -> Hash {
    if state.is_empty() {
        return EMPTY_ROOT;
    }

    let leaves: Vec<Hash> = if state.len() < PARALLEL_LEAF_THRESHOLD {
        state
            .iter()
            .map(|(account, balance)| hash_leaf(account, *balance))
            .collect()
    } else {
        let entries: Vec<(&AccountId, &Balance)> = state.iter().collect();
        entries
            .par_iter()
            .map(|(account, balance)| hash_leaf(account, **balance))
            .collect()
    };

    fold_levels(leaves)
}

fn fold_levels(mut level: Vec<Hash>) -> Hash {
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => hash_node(left, right),
                [single] => *single,
                _ => EMPTY_ROOT,
            })
            .collect();
    }
    level.first().copied().unwrap_or(EMPTY_ROOT)
}
