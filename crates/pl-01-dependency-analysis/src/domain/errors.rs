//! Error types for Dependency Analysis

use shared_types::{AccountId, TxId};
use std::fmt;
use thiserror::Error;

/// Batch-level structural errors.
///
/// Every variant rejects the entire batch before any execution; none of them
/// is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// A transaction failed structural validation
    #[error("Malformed transaction {tx}: {reason}")]
    MalformedTransaction { tx: TxId, reason: MalformedReason },

    /// Cycle detected in dependency graph
    #[error("Circular dependency: {}", format_cycle(.cycle))]
    CircularDependency { cycle: Vec<TxId> },

    /// Empty transaction batch
    #[error("Empty transaction batch")]
    EmptyBatch,

    /// Batch size exceeded limits
    #[error("Batch size exceeded: {size} > {max}")]
    BatchTooLarge { size: usize, max: usize },

    /// Edge count exceeded limits (anti-DoS)
    #[error("Edge count exceeded: {count} > {max}")]
    TooManyEdges { count: usize, max: usize },
}

impl AnalysisError {
    /// The named cycle, when this is a circular dependency
    pub fn cycle(&self) -> Option<&[TxId]> {
        match self {
            AnalysisError::CircularDependency { cycle } => Some(cycle),
            _ => None,
        }
    }
}

/// Why a transaction is malformed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    /// Neither reads nor writes were declared
    EmptyAccessSet,
    /// An account is not known to the directory
    UnknownAccount(AccountId),
    /// Another transaction in the batch has the same id
    DuplicateId,
    /// A prerequisite is not part of the batch
    UnknownPrerequisite(TxId),
    /// The transaction lists itself as a prerequisite
    SelfPrerequisite,
    /// A transfer or payout of zero
    ZeroAmount,
    /// A transfer whose source and destination are the same account
    SelfTransfer,
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedReason::EmptyAccessSet => write!(f, "empty read/write set"),
            MalformedReason::UnknownAccount(account) => {
                write!(f, "reference to nonexistent account {}", account)
            }
            MalformedReason::DuplicateId => write!(f, "duplicate transaction id"),
            MalformedReason::UnknownPrerequisite(id) => {
                write!(f, "prerequisite {} is not in the batch", id)
            }
            MalformedReason::SelfPrerequisite => write!(f, "lists itself as a prerequisite"),
            MalformedReason::ZeroAmount => write!(f, "zero amount"),
            MalformedReason::SelfTransfer => write!(f, "source and destination are the same account"),
        }
    }
}

fn format_cycle(cycle: &[TxId]) -> String {
    cycle
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
