//! Core entities for Dependency Analysis

use super::value_objects::{AccessSet, ConflictKind, EdgeReason};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared_types::{AccountId, Hash, TxId};
use std::collections::{BTreeMap, BTreeSet};

/// Transaction with its effective access set and batch position
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedTransaction {
    /// Transaction identifier
    pub id: TxId,
    /// Index in the submitted batch (submission order)
    pub position: usize,
    /// Effective reads/writes after conservative widening
    pub access: AccessSet,
    /// Declared prerequisites
    pub prerequisites: Vec<TxId>,
}

impl AnnotatedTransaction {
    pub fn new(id: TxId, position: usize, access: AccessSet) -> Self {
        Self {
            id,
            position,
            access,
            prerequisites: Vec::new(),
        }
    }

    pub fn with_prerequisites(mut self, prerequisites: Vec<TxId>) -> Self {
        self.prerequisites = prerequisites;
        self
    }
}

/// Dependency graph edge
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Transaction that must be applied first
    pub from: TxId,
    /// Transaction that must be applied after
    pub to: TxId,
    /// Why the edge exists
    pub reason: EdgeReason,
}

impl Dependency {
    pub fn new(from: TxId, to: TxId, reason: EdgeReason) -> Self {
        Self { from, to, reason }
    }
}

/// Classified conflict between two transactions
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConflictEdge {
    pub source: TxId,
    pub target: TxId,
    pub kind: ConflictKind,
    /// Accounts producing this conflict, ascending
    pub accounts: Vec<AccountId>,
}

/// Must-happen-before graph over one batch
///
/// Ordered maps keep iteration order a function of transaction ids only.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// All transactions by id
    pub nodes: BTreeMap<TxId, AnnotatedTransaction>,
    /// All edges, in insertion order
    pub edges: Vec<Dependency>,
    /// Adjacency list: from -> {to, ...}
    pub adjacency: BTreeMap<TxId, BTreeSet<TxId>>,
    /// Number of distinct predecessors per node
    pub in_degree: BTreeMap<TxId, usize>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transaction node to the graph
    pub fn add_node(&mut self, tx: AnnotatedTransaction) {
        let id = tx.id;
        self.nodes.insert(id, tx);
        self.adjacency.entry(id).or_default();
        self.in_degree.entry(id).or_insert(0);
    }

    /// Add a dependency edge.
    ///
    /// Parallel edges between the same pair are recorded in `edges` but counted
    /// once in the adjacency and in-degree bookkeeping. Returns `true` when the
    /// pair was not connected before.
    pub fn add_edge(&mut self, dep: Dependency) -> bool {
        let inserted = self.adjacency.entry(dep.from).or_default().insert(dep.to);
        if inserted {
            *self.in_degree.entry(dep.to).or_insert(0) += 1;
        }
        self.edges.push(dep);
        inserted
    }

    /// Check if an edge exists from -> to
    pub fn has_edge(&self, from: &TxId, to: &TxId) -> bool {
        self.adjacency
            .get(from)
            .map(|neighbors| neighbors.contains(to))
            .unwrap_or(false)
    }

    /// Successors of `id`, ascending
    pub fn successors(&self, id: &TxId) -> impl Iterator<Item = &TxId> {
        self.adjacency.get(id).into_iter().flat_map(|s| s.iter())
    }

    /// Nodes without predecessors, ascending
    pub fn roots(&self) -> Vec<TxId> {
        self.in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn contains(&self, id: &TxId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of distinct connected pairs
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(|s| s.len()).sum()
    }
}

/// A set of transactions that can run concurrently
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wave {
    /// Wave sequence number
    pub index: usize,
    /// Transactions in this wave, ascending by id
    pub transactions: Vec<TxId>,
}

impl Wave {
    pub fn new(index: usize, transactions: Vec<TxId>) -> Self {
        Self {
            index,
            transactions,
        }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

/// Canonical partition of a batch into ordered waves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSchedule {
    /// Ordered waves
    pub waves: Vec<Wave>,
    /// Total transactions scheduled
    pub total_transactions: usize,
    /// Size of the widest wave
    pub max_parallelism: usize,
}

impl ResolvedSchedule {
    pub fn new(waves: Vec<Wave>) -> Self {
        let total = waves.iter().map(|w| w.len()).sum();
        let max_par = waves.iter().map(|w| w.len()).max().unwrap_or(0);

        Self {
            waves,
            total_transactions: total,
            max_parallelism: max_par,
        }
    }

    /// Schedule with one transaction per wave, in the given order
    pub fn sequential(transactions: Vec<TxId>) -> Self {
        let waves = transactions
            .into_iter()
            .enumerate()
            .map(|(i, id)| Wave::new(i, vec![id]))
            .collect();

        Self::new(waves)
    }

    /// Flattened list of transactions in execution order
    pub fn flatten(&self) -> Vec<TxId> {
        self.waves
            .iter()
            .flat_map(|w| w.transactions.iter().copied())
            .collect()
    }

    /// Wave index of every scheduled transaction
    pub fn wave_of(&self) -> BTreeMap<TxId, usize> {
        self.waves
            .iter()
            .flat_map(|w| w.transactions.iter().map(move |id| (*id, w.index)))
            .collect()
    }

    /// Canonical bincode encoding, the unit of byte-for-byte comparison
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).unwrap_or_default()
    }

    /// SHA-256 over the canonical encoding
    pub fn fingerprint(&self) -> Hash {
        Sha256::digest(self.to_canonical_bytes()).into()
    }
}
