//! Dependency Graph Builder
//!
//! Builds the must-happen-before graph from annotated transactions.

use crate::domain::entities::{AnnotatedTransaction, Dependency, DependencyGraph};
use crate::domain::value_objects::EdgeReason;

/// Build a dependency graph from annotated transactions.
///
/// Two kinds of edges are added:
/// 1. Shared access: for every pair sharing an account with at least one
///    writer, the earlier transaction (by batch position) precedes the later.
/// 2. Declared: every prerequisite precedes the transaction that lists it.
///
/// Prerequisites are assumed to reference nodes of the batch; the service
/// validates that before calling in.
pub fn build_dependency_graph(transactions: Vec<AnnotatedTransaction>) -> DependencyGraph {
    let mut graph = DependencyGraph::new();

    let mut ordered = transactions;
    ordered.sort_by_key(|tx| tx.position);

    for i in 0..ordered.len() {
        for j in (i + 1)..ordered.len() {
            let earlier = &ordered[i];
            let later = &ordered[j];

            if !earlier.access.conflicts_with(&later.access).is_empty() {
                graph.add_edge(Dependency::new(earlier.id, later.id, EdgeReason::SharedAccess));
            }
        }
    }

    for tx in &ordered {
        let mut prerequisites = tx.prerequisites.clone();
        prerequisites.sort();
        prerequisites.dedup();

        for prerequisite in prerequisites {
            graph.add_edge(Dependency::new(prerequisite, tx.id, EdgeReason::Declared));
        }
    }

    for tx in ordered {
        graph.add_node(tx);
    }

    graph
}
