//! Core entities for Parallel Execution

use super::errors::TxFailure;
use super::value_objects::Segment;
use serde::{Deserialize, Serialize};
use shared_types::{net_deltas, AccountDelta, AccountMutation, BalanceSheet, TxId};
use std::collections::BTreeMap;

/// Final status of one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    /// Effects applied to the batch state
    Applied,
    /// No effects; the failure says why
    Failed(TxFailure),
}

impl TxStatus {
    pub fn is_applied(&self) -> bool {
        matches!(self, TxStatus::Applied)
    }
}

/// Per-transaction result handed to the caller and the commit stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutcome {
    pub tx: TxId,
    pub segment: Segment,
    pub status: TxStatus,
    /// Pre/post images, in account order. Empty unless applied.
    pub mutations: Vec<AccountMutation>,
}

/// One line of the wave-by-wave execution trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub tx: TxId,
    /// Global wave index (quarantine waves follow the main ones)
    pub wave: usize,
    pub segment: Segment,
    /// Logical time at which effects were applied; `None` if they never were
    pub applied_at: Option<u64>,
}

/// Record of what ran, in which wave, and when its effects landed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionTrace {
    pub entries: Vec<TraceEntry>,
}

impl ExecutionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    /// Logical apply time of `tx`, if it was applied
    pub fn applied_at(&self, tx: &TxId) -> Option<u64> {
        self.entries
            .iter()
            .find(|entry| entry.tx == *tx)
            .and_then(|entry| entry.applied_at)
    }

    /// Applied transactions ordered by apply time
    pub fn serial_order(&self) -> Vec<TxId> {
        let mut applied: Vec<(u64, TxId)> = self
            .entries
            .iter()
            .filter_map(|entry| entry.applied_at.map(|at| (at, entry.tx)))
            .collect();
        applied.sort();
        applied.into_iter().map(|(_, tx)| tx).collect()
    }

    /// Clear the apply time of every entry in `segment`
    pub fn retract_segment(&mut self, segment: Segment) {
        for entry in self.entries.iter_mut().filter(|e| e.segment == segment) {
            entry.applied_at = None;
        }
    }
}

/// Execution statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    pub tx_count: usize,
    pub wave_count: usize,
    pub max_wave_size: usize,
    pub applied: usize,
    pub failed: usize,
    pub quarantined: usize,
    pub workers: usize,
}

/// Everything the executor hands to the commit stage.
#[derive(Debug, Clone)]
pub struct BatchExecution {
    /// One outcome per transaction, ascending by id
    pub outcomes: Vec<TxOutcome>,
    pub trace: ExecutionTrace,
    /// Balances after all applied effects
    pub final_state: BalanceSheet,
    pub stats: ExecutionStats,
}

impl BatchExecution {
    pub fn outcome(&self, tx: &TxId) -> Option<&TxOutcome> {
        self.outcomes
            .binary_search_by_key(tx, |outcome| outcome.tx)
            .ok()
            .map(|index| &self.outcomes[index])
    }

    pub fn is_applied(&self, tx: &TxId) -> bool {
        self.outcome(tx)
            .map(|outcome| outcome.status.is_applied())
            .unwrap_or(false)
    }

    /// Mutations of applied transactions, in apply order
    pub fn applied_mutations(&self) -> Vec<(TxId, Vec<AccountMutation>)> {
        let by_id: BTreeMap<TxId, &TxOutcome> =
            self.outcomes.iter().map(|outcome| (outcome.tx, outcome)).collect();

        self.trace
            .serial_order()
            .into_iter()
            .filter_map(|tx| by_id.get(&tx).map(|outcome| (tx, outcome.mutations.clone())))
            .filter(|(_, mutations)| !mutations.is_empty())
            .collect()
    }

    /// Net per-account effect of the whole batch
    pub fn net_deltas(&self) -> Vec<AccountDelta> {
        let deltas: Vec<AccountDelta> = self
            .outcomes
            .iter()
            .filter(|outcome| outcome.status.is_applied())
            .flat_map(|outcome| outcome.mutations.iter().map(|m| m.delta()))
            .collect();
        net_deltas(&deltas)
    }
}
