//! Value objects for Dependency Analysis

use serde::{Deserialize, Serialize};
use shared_types::AccountId;
use std::collections::BTreeSet;
use std::fmt;

/// How a transaction accesses an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccessMode {
    Read,
    Write,
}

/// Classification of a conflict between an earlier (source) and a later
/// (target) transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConflictKind {
    /// Target reads what source writes
    ReadAfterWrite,
    /// Both write the same account
    WriteAfterWrite,
    /// Target writes what source reads
    WriteAfterRead,
}

impl ConflictKind {
    pub fn short(&self) -> &'static str {
        match self {
            ConflictKind::ReadAfterWrite => "RAW",
            ConflictKind::WriteAfterWrite => "WAW",
            ConflictKind::WriteAfterRead => "WAR",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short())
    }
}

/// Why a must-happen-before edge exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EdgeReason {
    /// The two transactions share an account under conflicting modes
    SharedAccess,
    /// The target listed the source as a prerequisite
    Declared,
}

/// Effective read and write sets of a transaction.
///
/// Sorted sets keep every derived structure independent of declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessSet {
    pub reads: BTreeSet<AccountId>,
    pub writes: BTreeSet<AccountId>,
}

impl AccessSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reads(mut self, reads: impl IntoIterator<Item = AccountId>) -> Self {
        self.reads.extend(reads);
        self
    }

    pub fn with_writes(mut self, writes: impl IntoIterator<Item = AccountId>) -> Self {
        self.writes.extend(writes);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.reads.is_empty() && self.writes.is_empty()
    }

    /// Every account in either set, ascending.
    pub fn touched(&self) -> BTreeSet<AccountId> {
        self.reads.union(&self.writes).cloned().collect()
    }

    /// Strongest access mode on `account`, if any.
    pub fn mode(&self, account: &AccountId) -> Option<AccessMode> {
        if self.writes.contains(account) {
            Some(AccessMode::Write)
        } else if self.reads.contains(account) {
            Some(AccessMode::Read)
        } else {
            None
        }
    }

    /// All conflicts between `self` (earlier) and `later`.
    ///
    /// Returns one entry per conflict kind present, each with the sorted list
    /// of accounts that produce it. A pair may carry several kinds at once.
    pub fn conflicts_with(&self, later: &AccessSet) -> Vec<(ConflictKind, Vec<AccountId>)> {
        let mut conflicts = Vec::new();

        let waw: Vec<AccountId> = self.writes.intersection(&later.writes).cloned().collect();
        if !waw.is_empty() {
            conflicts.push((ConflictKind::WriteAfterWrite, waw));
        }

        let raw: Vec<AccountId> = self.writes.intersection(&later.reads).cloned().collect();
        if !raw.is_empty() {
            conflicts.push((ConflictKind::ReadAfterWrite, raw));
        }

        let war: Vec<AccountId> = self.reads.intersection(&later.writes).cloned().collect();
        if !war.is_empty() {
            conflicts.push((ConflictKind::WriteAfterRead, war));
        }

        conflicts.sort_by_key(|(kind, _)| *kind);
        conflicts
    }
}
