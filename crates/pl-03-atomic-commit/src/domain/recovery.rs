//! # Crash Recovery Report
//!
//! Everything `recover_from_crash` did, in the order it did it.
//!
//! ## Steps
//!
//! 1. Discard log records that fail their content hash
//! 2. Roll back batches whose records are not all completed
//! 3. Delete orphaned temporary files
//! 4. Replay completed batches newer than the persisted root
//! 5. Recompute the Merkle root; restore the checkpoint on mismatch
//!
//! Every action is also appended to the audit log.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// =============================================================================
// AUDIT TRAIL
// =============================================================================

/// Kind of action recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    RecoveryStarted,
    CorruptRecordDiscarded,
    MutationRolledBack,
    BatchRolledBack,
    TempFileRemoved,
    BatchReplayed,
    RootVerified,
    RootMismatch,
    CheckpointRestored,
    RecoveryFinished,
    RecoveryFailed,
    BatchCommitted,
    BatchAborted,
    AccountsSeeded,
    LogCompacted,
    ManualRepairAccepted,
}

/// One timestamped audit log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: u64,
    pub action: AuditAction,
    pub batch_seq: Option<u64>,
    pub detail: String,
}

impl AuditEntry {
    pub fn new(timestamp_ms: u64, action: AuditAction, detail: impl Into<String>) -> Self {
        Self {
            timestamp_ms,
            action,
            batch_seq: None,
            detail: detail.into(),
        }
    }

    pub fn with_batch(mut self, batch_seq: u64) -> Self {
        self.batch_seq = Some(batch_seq);
        self
    }
}

// =============================================================================
// RECOVERY REPORT
// =============================================================================

/// Non-fatal problem met during recovery (logged and continued)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveryIssue {
    pub path: Option<PathBuf>,
    pub message: String,
}

impl RecoveryIssue {
    pub fn new(path: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}

/// Result of a crash recovery run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecoveryReport {
    /// Recovery reached a verified state
    pub recovered: bool,
    /// Log records found with the completion flag unset
    pub uncommitted_count: usize,
    /// Mutations restored to their pre-image
    pub rolled_back_count: usize,
    /// Completed batches re-applied from the log
    pub replayed_batches: usize,
    pub corrupt_records: usize,
    pub temp_files_cleaned: usize,
    pub merkle_verified: bool,
    pub checkpoint_restored: bool,
    pub duration_ms: u64,
    /// Audit entries in the order they were emitted
    pub audit: Vec<AuditEntry>,
    pub errors: Vec<RecoveryIssue>,
}

impl RecoveryReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, issue: RecoveryIssue) {
        self.errors.push(issue);
    }

    /// Nothing had to be undone, redone or cleaned
    pub fn is_clean(&self) -> bool {
        self.uncommitted_count == 0
            && self.rolled_back_count == 0
            && self.replayed_batches == 0
            && self.corrupt_records == 0
            && self.temp_files_cleaned == 0
            && !self.checkpoint_restored
    }

    /// Audit entries of one kind
    pub fn actions(&self, action: AuditAction) -> impl Iterator<Item = &AuditEntry> {
        self.audit.iter().filter(move |entry| entry.action == action)
    }
}
