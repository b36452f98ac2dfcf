//! Error types for Atomic Commit

use shared_types::{AccountId, Balance, Hash, TxId};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the on-disk adapters (WAL, account store, checkpoint).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// Checksum or content hash mismatch, or undecodable bytes
    #[error("corrupt file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("encoding error: {0}")]
    Encoding(String),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, error: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            message: error.to_string(),
        }
    }

    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StoreError::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Errors from the data-directory lock
#[derive(Debug, Error)]
pub enum LockError {
    #[error("failed to create lock file: {0}")]
    CreateFailed(#[source] io::Error),

    #[error("data directory already in use{} ({})", .pid.map(|p| format!(" by process {p}")).unwrap_or_default(), .path.display())]
    AlreadyLocked { pid: Option<u32>, path: PathBuf },

    #[error("failed to write PID to lock file: {0}")]
    WriteFailed(#[source] io::Error),
}

/// Errors returned by `commit` and `seed_accounts`.
#[derive(Debug, Error)]
pub enum CommitError {
    /// A fatal recovery error left the manager halted
    #[error("commit manager halted: {reason}")]
    Halted { reason: String },

    /// The log holds unfinished work; run `recover_from_crash` first
    #[error("write-ahead log holds {pending} unfinished records; recovery required")]
    RecoveryRequired { pending: usize },

    /// The mutation was computed against a balance that is no longer current
    #[error("stale pre-image for {account} in {tx}: expected {expected:?}, found {found:?}")]
    StalePreImage {
        tx: TxId,
        account: AccountId,
        expected: Option<Balance>,
        found: Option<Balance>,
    },

    /// More mutations than a log record can count
    #[error("batch of {mutations} mutations exceeds the log record limit")]
    BatchTooLarge { mutations: usize },

    /// Seeding an account that is already open
    #[error("account {0} already exists")]
    AccountExists(AccountId),

    /// Cancelled before the apply phase
    #[error("batch {batch_seq} aborted before apply")]
    Aborted { batch_seq: u64 },

    /// Logging failed; durable state was not touched
    #[error("write-ahead logging failed: {0}")]
    Logging(#[source] StoreError),

    /// Applying failed midway; recovery rolls the batch back
    #[error("apply failed, recovery required: {0}")]
    Apply(#[source] StoreError),

    #[error("failed to persist state root: {0}")]
    RootPersist(#[source] StoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Lock(#[from] LockError),

    /// Simulated crash from the fault-injection harness
    #[cfg(feature = "fault-injection")]
    #[error("injected crash at {0:?}")]
    InjectedCrash(crate::fault::CrashPoint),
}

/// Fatal recovery errors. Batch processing stays halted until resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecoveryError {
    /// Durable state does not match the persisted root, even after
    /// restoring the last checkpoint
    #[error("merkle root mismatch after checkpoint restore: persisted {}, computed {}", hex::encode(.expected), hex::encode(.actual))]
    MerkleMismatch { expected: Hash, actual: Hash },

    /// A replayed batch did not reproduce the root recorded in its log
    #[error("replay of batch {batch_seq} produced {}, log expects {}", hex::encode(.actual), hex::encode(.expected))]
    ReplayMismatch {
        batch_seq: u64,
        expected: Hash,
        actual: Hash,
    },

    /// Manual repair left unfinished log records behind
    #[error("{count} log records still pending; run recovery")]
    PendingRecords { count: usize },

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Simulated crash from the fault-injection harness
    #[cfg(feature = "fault-injection")]
    #[error("injected crash at {0:?}")]
    InjectedCrash(crate::fault::CrashPoint),
}
