//! Core entities for Atomic Commit

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared_types::{AccountId, AccountMutation, BalanceSheet, Hash, TxId};
use std::fmt;

/// Commit manager lifecycle.
///
/// `Idle -> Logging -> Applying -> Committed`, or `Aborted` from `Logging`
/// and `Applying`. `Halted` is entered only after a fatal recovery error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommitState {
    Idle,
    Logging,
    Applying,
    Committed,
    Aborted,
    Halted,
}

impl CommitState {
    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: CommitState) -> bool {
        use CommitState::*;
        match (self, next) {
            (Halted, Idle) => true,
            (Halted, _) => false,
            (_, Halted) => true,
            (Idle | Committed | Aborted, Logging) => true,
            (Logging, Applying) | (Logging, Aborted) => true,
            (Applying, Committed) | (Applying, Aborted) => true,
            (Committed | Aborted, Idle) => true,
            _ => false,
        }
    }

    /// A batch may start from this state
    pub fn is_ready(self) -> bool {
        matches!(
            self,
            CommitState::Idle | CommitState::Committed | CommitState::Aborted
        )
    }
}

impl fmt::Display for CommitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommitState::Idle => "IDLE",
            CommitState::Logging => "LOGGING",
            CommitState::Applying => "APPLYING",
            CommitState::Committed => "COMMITTED",
            CommitState::Aborted => "ABORTED",
            CommitState::Halted => "HALTED",
        };
        f.write_str(name)
    }
}

/// Effects of one applied transaction, as handed to the commit stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxEffects {
    pub tx: TxId,
    /// Content digest of the transaction that produced the mutations
    pub digest: Hash,
    pub mutations: Vec<AccountMutation>,
}

impl TxEffects {
    pub fn new(tx: TxId, digest: Hash, mutations: Vec<AccountMutation>) -> Self {
        Self {
            tx,
            digest,
            mutations,
        }
    }
}

/// One batch worth of effects, in apply order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitBatch {
    pub effects: Vec<TxEffects>,
}

impl CommitBatch {
    pub fn new(effects: Vec<TxEffects>) -> Self {
        Self { effects }
    }

    /// Total number of account mutations, i.e. log records
    pub fn mutation_count(&self) -> usize {
        self.effects.iter().map(|e| e.mutations.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.mutation_count() == 0
    }
}

/// A single write-ahead log record: one account mutation of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Monotonic across the whole log
    pub seq: u64,
    pub batch_seq: u64,
    /// Number of records the batch wrote
    pub batch_len: u32,
    pub tx: TxId,
    pub tx_digest: Hash,
    pub mutation: AccountMutation,
    /// State root expected once the whole batch is applied
    pub batch_root: Hash,
    /// Set once the mutation has reached durable state
    pub completed: bool,
}

impl CommitRecord {
    /// SHA-256 over the canonical encoding, used to detect torn writes.
    pub fn content_hash(&self) -> Hash {
        let encoded = bincode::serialize(self).unwrap_or_default();
        Sha256::digest(&encoded).into()
    }

    pub fn account(&self) -> &AccountId {
        &self.mutation.account
    }
}

/// Root persisted next to the account files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRoot {
    pub root: Hash,
    /// Last batch whose effects the root covers; 0 before any commit
    pub batch_seq: u64,
    /// Highest log sequence number handed out so far
    pub last_seq: u64,
}

impl PersistedRoot {
    pub fn genesis(root: Hash) -> Self {
        Self {
            root,
            batch_seq: 0,
            last_seq: 0,
        }
    }
}

/// Last known-good snapshot of the whole account state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub batch_seq: u64,
    pub root: Hash,
    pub balances: BalanceSheet,
}

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub batch_seq: u64,
    pub previous_root: Hash,
    pub root: Hash,
    pub records_written: usize,
    pub accounts_touched: usize,
    pub duration_ms: u64,
}

impl CommitReceipt {
    pub fn root_hex(&self) -> String {
        hex::encode(self.root)
    }
}
