//! Application layer for Atomic Commit.

mod recovery;
pub mod service;

pub use service::{CommitManager, SEED_TX};
