//! # Driving Ports (API - Inbound)

use crate::algorithms::LinearizabilityCertificate;
use crate::domain::entities::{BatchExecution, ExecutionTrace};
use crate::domain::errors::ExecutionError;
use pl_01_dependency_analysis::{AnalysisOutcome, DependencyGraph};
use shared_types::{AbortSignal, BalanceSheet, Transaction};

/// Primary Parallel Execution API
pub trait ParallelExecutionApi: Send + Sync {
    /// Run an analyzed batch wave by wave on top of `state`.
    ///
    /// `state` is not modified; the post-batch balances are returned in
    /// [`BatchExecution::final_state`]. `abort` is polled before every wave.
    fn execute(
        &self,
        batch: &[Transaction],
        analysis: &AnalysisOutcome,
        state: &BalanceSheet,
        abort: &AbortSignal,
    ) -> Result<BatchExecution, ExecutionError>;

    /// Audit a trace against the graph it was scheduled from.
    fn prove(&self, graph: &DependencyGraph, trace: &ExecutionTrace) -> LinearizabilityCertificate;
}
