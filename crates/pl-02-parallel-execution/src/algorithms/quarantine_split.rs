//! Segment split for quarantined transactions
//!
//! Anything downstream of a suspicious transaction joins the quarantine
//! segment too. The main segment runs first, so a main transaction may never
//! depend on a quarantined one.

use pl_01_dependency_analysis::{DependencyGraph, ResolvedSchedule};
use shared_types::TxId;
use std::collections::{BTreeSet, VecDeque};

/// Suspicious transactions plus every transaction reachable from them.
pub fn taint_closure(graph: &DependencyGraph, suspicious: &BTreeSet<TxId>) -> BTreeSet<TxId> {
    let mut tainted: BTreeSet<TxId> = suspicious.clone();
    let mut queue: VecDeque<TxId> = suspicious.iter().copied().collect();

    while let Some(tx) = queue.pop_front() {
        for successor in graph.successors(&tx) {
            if tainted.insert(*successor) {
                queue.push_back(*successor);
            }
        }
    }

    tainted
}

/// Split the waves of `schedule` into main and quarantine waves.
///
/// Wave order and in-wave id order are preserved; emptied waves are dropped.
pub fn split_schedule(
    schedule: &ResolvedSchedule,
    quarantined: &BTreeSet<TxId>,
) -> (Vec<Vec<TxId>>, Vec<Vec<TxId>>) {
    let mut main = Vec::new();
    let mut isolated = Vec::new();

    for wave in &schedule.waves {
        let (q, m): (Vec<TxId>, Vec<TxId>) = wave
            .transactions
            .iter()
            .partition(|tx| quarantined.contains(*tx));
        if !m.is_empty() {
            main.push(m);
        }
        if !q.is_empty() {
            isolated.push(q);
        }
    }

    (main, isolated)
}
