//! # PL-03: Atomic Commit Subsystem
//!
//! Makes the effects of an executed batch durable, or none of them.
//!
//! ## Responsibilities
//!
//! - Write-ahead log: one sequence-numbered, content-hashed record per
//!   account mutation, written before durable state is touched
//! - Durable account files and the persisted Merkle state root
//! - Checkpoints of the last known-good state
//! - Idempotent crash recovery with a report and an append-only audit log
//! - Exclusive ownership of the data directory
//!
//! ## On-disk layout
//!
//! ```text
//! <data_dir>/
//!   LOCK                      owner PID, fs2 exclusive lock
//!   wal/<seq>.rec             commit records
//!   state/accounts/<hex>.acct one balance per account
//!   state/ROOT                persisted root and batch sequence
//!   checkpoint/snapshot.bin   last known-good state
//!   audit.log                 JSON lines
//! ```

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
#[cfg(feature = "fault-injection")]
pub mod fault;
pub mod ports;

pub use adapters::{FileAuditLog, MemoryAuditLog, SystemTimeSource};
pub use algorithms::{compute_state_root, EMPTY_ROOT};
pub use application::{CommitManager, SEED_TX};
pub use config::CommitConfig;
pub use domain::entities::*;
pub use domain::errors::{CommitError, LockError, RecoveryError, StoreError};
pub use domain::recovery::{AuditAction, AuditEntry, RecoveryIssue, RecoveryReport};
#[cfg(feature = "fault-injection")]
pub use fault::CrashPoint;
pub use ports::inbound::AtomicCommitApi;
pub use ports::outbound::{AuditSink, ChecksumProvider, TimeSource};
