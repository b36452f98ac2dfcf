//! Adapters layer for Atomic Commit.

pub mod account_store;
pub mod audit_log;
pub mod checkpoint;
pub mod infra;
pub mod lock;
pub mod wal;

pub use account_store::{FileAccountStore, LoadedState};
pub use audit_log::{FileAuditLog, MemoryAuditLog};
pub use checkpoint::CheckpointStore;
pub use infra::{DefaultChecksumProvider, SystemTimeSource};
pub use lock::DataDirLock;
pub use wal::{WalScan, WriteAheadLog};
