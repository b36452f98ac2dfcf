//! Inbound Ports (Driving Ports / API)

use crate::algorithms::ConflictReport;
use crate::application::service::AnalysisOutcome;
use crate::domain::entities::{DependencyGraph, ResolvedSchedule};
use crate::domain::errors::AnalysisError;
use shared_types::Transaction;

/// Primary Dependency Analysis API
pub trait DependencyAnalysisApi: Send + Sync {
    /// Analyze a batch and produce its canonical schedule.
    ///
    /// This is the main entry point. It:
    /// 1. Validates the batch and derives access sets
    /// 2. Builds the dependency graph
    /// 3. Classifies every conflict and rejects cycles
    /// 4. Layers the graph into waves
    fn analyze(&self, batch: &[Transaction]) -> Result<AnalysisOutcome, AnalysisError>;

    /// Dependency Analyzer stage alone.
    fn build_graph(&self, batch: &[Transaction]) -> Result<DependencyGraph, AnalysisError>;

    /// Conflict Detector stage: classify, add missing edges, reject cycles.
    fn detect_conflicts(&self, graph: &mut DependencyGraph) -> Result<ConflictReport, AnalysisError>;

    /// Conflict Resolver stage: deterministic wave layering.
    fn resolve(&self, graph: &DependencyGraph) -> Result<ResolvedSchedule, AnalysisError>;
}
