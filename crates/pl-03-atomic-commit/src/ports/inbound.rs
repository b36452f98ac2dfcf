//! Inbound ports (API)

use crate::domain::entities::{CommitBatch, CommitReceipt, CommitState};
use crate::domain::errors::{CommitError, RecoveryError};
use crate::domain::recovery::RecoveryReport;
use shared_types::{AbortSignal, AccountId, Balance, BalanceSheet, Hash};

/// Primary API of the commit manager
pub trait AtomicCommitApi: Send + Sync {
    /// Log every mutation, then apply it and mark its record completed.
    ///
    /// The abort signal is honoured until the apply phase starts.
    fn commit(&self, batch: CommitBatch, abort: &AbortSignal) -> Result<CommitReceipt, CommitError>;

    /// Open accounts with their initial balances as one committed batch
    fn seed_accounts(&self, balances: Vec<(AccountId, Balance)>) -> Result<CommitReceipt, CommitError>;

    /// Roll back unfinished batches, clean up, replay and verify the root.
    ///
    /// Idempotent: a second run finds nothing to undo.
    fn recover_from_crash(&self) -> Result<RecoveryReport, RecoveryError>;

    /// Leave the halted state once durable state verifies again
    fn resume_after_manual_repair(&self) -> Result<Hash, RecoveryError>;

    /// Committed state root
    fn state_root(&self) -> Hash;

    /// Committed balances
    fn balances(&self) -> BalanceSheet;

    fn state(&self) -> CommitState;
}
