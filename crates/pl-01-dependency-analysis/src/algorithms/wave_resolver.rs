//! Wave Resolver (Kahn layering)
//!
//! O(V + E). Every node whose remaining in-degree is zero joins the current
//! wave; ties inside a wave are broken by ascending transaction id.

use crate::algorithms::cycle_detector::find_cycle;
use crate::domain::entities::{DependencyGraph, ResolvedSchedule, Wave};
use crate::domain::errors::AnalysisError;
use shared_types::TxId;
use std::collections::BTreeMap;

/// Partition an acyclic graph into ordered waves.
///
/// A cyclic graph is rejected with the cycle found by [`find_cycle`].
pub fn resolve_waves(graph: &DependencyGraph) -> Result<ResolvedSchedule, AnalysisError> {
    if graph.nodes.is_empty() {
        return Ok(ResolvedSchedule::new(vec![]));
    }

    let mut in_degree: BTreeMap<TxId, usize> = graph.in_degree.clone();

    // BTreeMap iteration is already ascending
    let mut queue: Vec<TxId> = graph.roots();

    let mut waves: Vec<Wave> = Vec::new();
    let mut scheduled_count = 0;

    while !queue.is_empty() {
        let current: Vec<TxId> = std::mem::take(&mut queue);
        scheduled_count += current.len();

        let mut next_queue: Vec<TxId> = Vec::new();

        for node in &current {
            for neighbor in graph.successors(node) {
                let Some(degree) = in_degree.get_mut(neighbor) else {
                    continue;
                };
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    next_queue.push(*neighbor);
                }
            }
        }

        waves.push(Wave::new(waves.len(), current));

        next_queue.sort();
        queue = next_queue;
    }

    if scheduled_count < graph.nodes.len() {
        let cycle = find_cycle(graph).unwrap_or_default();
        return Err(AnalysisError::CircularDependency { cycle });
    }

    Ok(ResolvedSchedule::new(waves))
}
