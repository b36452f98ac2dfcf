//! Linearizability Prover
//!
//! Post-hoc audit of an execution trace against the dependency graph. For
//! every edge A -> B whose endpoints were both applied, A's effects must have
//! landed strictly before B's. Edges touching an unapplied transaction are
//! skipped: a transaction with no effects cannot be observed out of order.

use crate::domain::entities::ExecutionTrace;
use pl_01_dependency_analysis::DependencyGraph;
use serde::{Deserialize, Serialize};
use shared_types::TxId;
use std::collections::BTreeMap;

/// Result of the audit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearizabilityCertificate {
    pub linearizable: bool,
    /// Applied transactions in apply order: the witnessing serial execution
    pub serial_order: Vec<TxId>,
    /// First offending edge, in ascending (source, target) order
    pub violation: Option<(TxId, TxId)>,
    /// Edges whose endpoints were both applied
    pub edges_checked: usize,
}

/// Check every graph edge against the trace.
pub fn prove_linearizable(graph: &DependencyGraph, trace: &ExecutionTrace) -> LinearizabilityCertificate {
    let applied: BTreeMap<TxId, u64> = trace
        .entries
        .iter()
        .filter_map(|entry| entry.applied_at.map(|at| (entry.tx, at)))
        .collect();

    let mut edges_checked = 0;
    let mut violation = None;

    'outer: for (from, successors) in &graph.adjacency {
        let Some(from_at) = applied.get(from) else {
            continue;
        };
        for to in successors {
            let Some(to_at) = applied.get(to) else {
                continue;
            };
            edges_checked += 1;
            if from_at >= to_at {
                violation = Some((*from, *to));
                break 'outer;
            }
        }
    }

    LinearizabilityCertificate {
        linearizable: violation.is_none(),
        serial_order: trace.serial_order(),
        violation,
        edges_checked,
    }
}
