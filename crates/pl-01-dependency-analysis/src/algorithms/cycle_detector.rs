//! Cycle search over the dependency graph
//!
//! Iterative depth-first search in ascending id order, so the reported cycle
//! is the same on every run for the same graph.

use crate::domain::entities::DependencyGraph;
use shared_types::TxId;
use std::collections::BTreeMap;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnStack,
    Done,
}

/// Find a cycle, returned as `[a, b, ..., a]`.
pub fn find_cycle(graph: &DependencyGraph) -> Option<Vec<TxId>> {
    let mut marks: BTreeMap<TxId, Mark> = BTreeMap::new();

    for start in graph.adjacency.keys() {
        if marks.contains_key(start) {
            continue;
        }

        // Path of nodes currently on the DFS stack, with their successor lists
        let mut path: Vec<TxId> = vec![*start];
        let mut frames: Vec<Vec<TxId>> = vec![successors_desc(graph, start)];
        marks.insert(*start, Mark::OnStack);

        while let Some(frame) = frames.last_mut() {
            match frame.pop() {
                Some(next) => match marks.get(&next) {
                    Some(Mark::OnStack) => {
                        let begin = path.iter().position(|id| *id == next).unwrap_or(0);
                        let mut cycle = path[begin..].to_vec();
                        cycle.push(next);
                        return Some(cycle);
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(next, Mark::OnStack);
                        frames.push(successors_desc(graph, &next));
                        path.push(next);
                    }
                },
                None => {
                    frames.pop();
                    if let Some(done) = path.pop() {
                        marks.insert(done, Mark::Done);
                    }
                }
            }
        }
    }

    None
}

// Reversed so that `pop` yields the smallest successor first
fn successors_desc(graph: &DependencyGraph, id: &TxId) -> Vec<TxId> {
    let mut successors: Vec<TxId> = graph.successors(id).copied().collect();
    successors.reverse();
    successors
}
