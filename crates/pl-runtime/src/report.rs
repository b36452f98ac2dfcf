//! Batch outcome handed back to the submitter.

use pl_01_dependency_analysis::{ConflictReport, ResolvedSchedule};
use pl_02_parallel_execution::{ExecutionStats, LinearizabilityCertificate, TxFailure, TxOutcome, TxStatus};
use pl_03_atomic_commit::CommitReceipt;
use shared_types::TxId;

/// Result of a committed batch.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub receipt: CommitReceipt,
    pub schedule: ResolvedSchedule,
    pub conflicts: ConflictReport,
    /// One per transaction, ascending by id
    pub outcomes: Vec<TxOutcome>,
    pub certificate: LinearizabilityCertificate,
    pub stats: ExecutionStats,
}

impl BatchReport {
    /// Transactions whose effects were committed, ascending by id
    pub fn applied(&self) -> Vec<TxId> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status.is_applied())
            .map(|outcome| outcome.tx)
            .collect()
    }

    pub fn failed(&self) -> Vec<(TxId, &TxFailure)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match &outcome.status {
                TxStatus::Failed(failure) => Some((outcome.tx, failure)),
                TxStatus::Applied => None,
            })
            .collect()
    }

    pub fn wave_count(&self) -> usize {
        self.schedule.waves.len()
    }
}
