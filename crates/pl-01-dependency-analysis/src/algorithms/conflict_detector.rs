//! Conflict Detector
//!
//! Classifies every conflicting pair of a batch. The check is exhaustive: all
//! n(n-1)/2 pairs are compared, no sampling and no early exit. Any classified
//! conflict missing from the graph is added as an edge before cycle search.

use crate::algorithms::cycle_detector::find_cycle;
use crate::domain::entities::{ConflictEdge, Dependency, DependencyGraph};
use crate::domain::errors::AnalysisError;
use crate::domain::value_objects::EdgeReason;
use tracing::warn;

/// Result of a full conflict scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictReport {
    /// One edge per (pair, kind), sorted by (source, target, kind)
    pub edges: Vec<ConflictEdge>,
    /// Pairs that had to be added to the graph
    pub added_edges: usize,
    /// Number of pairs compared
    pub pairs_checked: usize,
}

impl ConflictReport {
    /// Fraction of compared pairs in conflict, as a percentage
    pub fn conflict_percentage(&self) -> u8 {
        if self.pairs_checked == 0 {
            return 0;
        }

        let mut pairs: Vec<_> = self.edges.iter().map(|e| (e.source, e.target)).collect();
        pairs.dedup();

        let percent = (pairs.len() * 100) / self.pairs_checked;
        percent.min(100) as u8
    }
}

/// Classify all conflicts in `graph` and add any missing edges.
pub fn detect_conflicts(graph: &mut DependencyGraph) -> ConflictReport {
    let mut ordered: Vec<_> = graph.nodes.values().collect();
    ordered.sort_by_key(|tx| tx.position);

    let mut edges = Vec::new();
    let mut missing = Vec::new();
    let mut pairs_checked = 0;

    for i in 0..ordered.len() {
        for j in (i + 1)..ordered.len() {
            pairs_checked += 1;
            let earlier = ordered[i];
            let later = ordered[j];

            let conflicts = earlier.access.conflicts_with(&later.access);
            if conflicts.is_empty() {
                continue;
            }

            if !graph.has_edge(&earlier.id, &later.id) {
                missing.push((earlier.id, later.id));
            }

            for (kind, accounts) in conflicts {
                edges.push(ConflictEdge {
                    source: earlier.id,
                    target: later.id,
                    kind,
                    accounts,
                });
            }
        }
    }

    let added_edges = missing.len();
    for (from, to) in missing {
        warn!("[pl-01] conflict {} -> {} was missing from the graph", from, to);
        graph.add_edge(Dependency::new(from, to, EdgeReason::SharedAccess));
    }

    edges.sort();

    ConflictReport {
        edges,
        added_edges,
        pairs_checked,
    }
}

/// Reject graphs with a cycle, naming it.
pub fn ensure_acyclic(graph: &DependencyGraph) -> Result<(), AnalysisError> {
    match find_cycle(graph) {
        Some(cycle) => Err(AnalysisError::CircularDependency { cycle }),
        None => Ok(()),
    }
}
