//! # Data Directory Locking
//!
//! Only one commit manager may own a data directory. The WAL and the account
//! files assume a single writer.

mod flock;
pub mod security;

pub use flock::DataDirLock;
