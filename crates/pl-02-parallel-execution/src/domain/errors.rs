//! Error types for Parallel Execution

use shared_types::{AccountId, Balance, TxId};
use thiserror::Error;

/// Verifier verdict for a rejected transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("verifier rejected: {reason}")]
pub struct VerificationRejection {
    pub reason: String,
}

impl VerificationRejection {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Conservation check failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("conservation violated: {detail}")]
pub struct ConservationViolation {
    pub detail: String,
}

impl ConservationViolation {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Why a single transaction produced no effects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxFailure {
    #[error(transparent)]
    Rejected(#[from] VerificationRejection),

    #[error(transparent)]
    Conservation(#[from] ConservationViolation),

    #[error("insufficient funds in {account}: balance {balance}, required {required}")]
    InsufficientFunds {
        account: AccountId,
        balance: Balance,
        required: Balance,
    },

    #[error("account {0} is not open")]
    MissingAccount(AccountId),

    #[error("balance overflow on {0}")]
    Overflow(AccountId),

    /// Dropped because another transaction of its quarantine segment failed
    #[error("quarantine segment dropped after {failed} failed")]
    QuarantineDropped { failed: TxId },
}

/// Batch-level execution errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// A main-segment transaction failed under all-or-nothing atomicity
    #[error("transaction {tx} failed: {failure}")]
    TransactionFailed { tx: TxId, failure: TxFailure },

    /// Net effect of the batch fails the conservation check
    #[error("batch {0}")]
    BatchConservation(ConservationViolation),

    /// Cancelled before wave `wave` started
    #[error("batch aborted before wave {wave}")]
    Aborted { wave: usize },

    /// The schedule names a transaction absent from the batch
    #[error("schedule references unknown transaction {0}")]
    UnknownTransaction(TxId),

    /// Worker pool could not be built
    #[error("worker pool error: {0}")]
    WorkerPool(String),
}

impl ExecutionError {
    /// Transaction named by the error, if any
    pub fn transaction(&self) -> Option<TxId> {
        match self {
            ExecutionError::TransactionFailed { tx, .. } => Some(*tx),
            ExecutionError::UnknownTransaction(tx) => Some(*tx),
            _ => None,
        }
    }
}
