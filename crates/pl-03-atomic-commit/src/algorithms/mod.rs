//! Algorithms module for Atomic Commit

pub mod merkle;

pub use merkle::{compute_state_root, hash_leaf, EMPTY_ROOT, PARALLEL_LEAF_THRESHOLD};
