//! Domain invariants for Dependency Analysis
//!
//! Boolean checkers used by the service's self-audit and by tests. None of
//! them mutates its inputs.

use super::entities::{ConflictEdge, DependencyGraph, ResolvedSchedule, Wave};
use shared_types::TxId;
use std::collections::{BTreeSet, HashSet};

/// INVARIANT-1: Topological Order
/// If A -> B exists, A's wave precedes B's wave.
pub fn invariant_topological_order(schedule: &ResolvedSchedule, graph: &DependencyGraph) -> bool {
    let waves = schedule.wave_of();

    for edge in &graph.edges {
        match (waves.get(&edge.from), waves.get(&edge.to)) {
            (Some(from), Some(to)) if from < to => {}
            _ => return false,
        }
    }

    true
}

/// INVARIANT-2: No Cycles
/// The dependency graph must be a DAG.
pub fn invariant_no_cycles(graph: &DependencyGraph) -> bool {
    crate::algorithms::cycle_detector::find_cycle(graph).is_none()
}

/// INVARIANT-3: Parallel Safety
/// Transactions in the same wave have no edges between them.
pub fn invariant_parallel_safety(wave: &Wave, graph: &DependencyGraph) -> bool {
    for i in 0..wave.transactions.len() {
        for j in (i + 1)..wave.transactions.len() {
            let tx_i = &wave.transactions[i];
            let tx_j = &wave.transactions[j];

            if graph.has_edge(tx_i, tx_j) || graph.has_edge(tx_j, tx_i) {
                return false;
            }
        }
    }

    true
}

/// INVARIANT-4: Schedule Completeness
/// All transactions are scheduled exactly once.
pub fn invariant_schedule_completeness(schedule: &ResolvedSchedule, graph: &DependencyGraph) -> bool {
    let flat = schedule.flatten();
    let scheduled: HashSet<TxId> = flat.iter().copied().collect();
    if scheduled.len() != flat.len() {
        return false;
    }

    let all: HashSet<TxId> = graph.nodes.keys().copied().collect();
    scheduled == all
}

/// INVARIANT-5: Conflict Completeness
/// Every pair sharing an account under conflicting modes has a classified
/// edge, and every such edge is backed by a graph edge.
pub fn invariant_conflict_completeness(graph: &DependencyGraph, conflicts: &[ConflictEdge]) -> bool {
    let classified: BTreeSet<(TxId, TxId)> =
        conflicts.iter().map(|c| (c.source, c.target)).collect();

    let mut ordered: Vec<_> = graph.nodes.values().collect();
    ordered.sort_by_key(|tx| tx.position);

    for i in 0..ordered.len() {
        for j in (i + 1)..ordered.len() {
            let (earlier, later) = (ordered[i], ordered[j]);
            if earlier.access.conflicts_with(&later.access).is_empty() {
                continue;
            }
            if !classified.contains(&(earlier.id, later.id)) {
                return false;
            }
            if !graph.has_edge(&earlier.id, &later.id) {
                return false;
            }
        }
    }

    true
}
