//! Engine errors

use pl_01_dependency_analysis::AnalysisError;
use pl_02_parallel_execution::ExecutionError;
use pl_03_atomic_commit::{CommitError, RecoveryError};
use shared_types::TxId;
use thiserror::Error;

/// Why a batch, or the engine itself, failed.
///
/// Every variant except `Recovery` and `Commit` leaves durable state
/// untouched.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("analysis rejected the batch: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("execution failed: {0}")]
    Execution(#[from] ExecutionError),

    /// The executed trace broke a dependency edge
    #[error("execution trace is not linearizable: edge {from} -> {to} violated")]
    NotLinearizable { from: TxId, to: TxId },

    #[error("commit failed: {0}")]
    Commit(#[from] CommitError),

    #[error("recovery failed: {0}")]
    Recovery(#[from] RecoveryError),
}

impl EngineError {
    /// True when durable state may need recovery before the next batch
    pub fn requires_recovery(&self) -> bool {
        matches!(
            self,
            EngineError::Commit(CommitError::RecoveryRequired { .. })
                | EngineError::Commit(CommitError::Apply(_))
                | EngineError::Commit(CommitError::RootPersist(_))
                | EngineError::Recovery(_)
        ) || self.is_injected_crash()
    }

    #[cfg(feature = "fault-injection")]
    fn is_injected_crash(&self) -> bool {
        matches!(self, EngineError::Commit(CommitError::InjectedCrash(_)))
    }

    #[cfg(not(feature = "fault-injection"))]
    fn is_injected_crash(&self) -> bool {
        false
    }
}
