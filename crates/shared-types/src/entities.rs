//! # Core Domain Entities
//!
//! Defines the ledger entities that flow through the batch pipeline.
//!
//! ## Clusters
//!
//! - **Identity**: `TxId`, `AccountId`
//! - **Operations**: `Operation`, `Transaction`
//! - **State**: `Balance`, `BalanceSheet`, `AccountMutation`, `AccountDelta`

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A 32-byte SHA-256 hash.
pub type Hash = [u8; 32];

/// Account balance in base units.
pub type Balance = u128;

/// Signed balance change applied to a single account.
pub type SignedAmount = i128;

/// Balances of every open account, ordered by account id.
pub type BalanceSheet = std::collections::BTreeMap<AccountId, Balance>;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Unique identifier of a transaction within the ledger.
///
/// The derived `Ord` is the fixed total order used to break ties whenever the
/// pipeline has to choose between otherwise unordered transactions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct TxId(pub u64);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

impl From<u64> for TxId {
    fn from(value: u64) -> Self {
        TxId(value)
    }
}

/// Identifier of a ledger account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        AccountId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        AccountId(value.to_string())
    }
}

impl From<String> for AccountId {
    fn from(value: String) -> Self {
        AccountId(value)
    }
}

// =============================================================================
// CLUSTER B: OPERATIONS
// =============================================================================

/// The operation body carried by a transaction.
///
/// The external verifier receives it untouched. The three structured variants
/// have a built-in state transition; `Opaque` bodies are verified only and
/// their account accesses cannot be separated into reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Move `amount` from one account to another.
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: Balance,
    },
    /// Pay every payee from a single payer account.
    Payroll {
        payer: AccountId,
        payees: Vec<(AccountId, Balance)>,
    },
    /// Sweep the entire balance of `account` into `beneficiary`.
    Liquidation {
        account: AccountId,
        beneficiary: AccountId,
    },
    /// Operation body with unknown semantics.
    Opaque(Vec<u8>),
}

impl Operation {
    /// Accounts whose balance this operation reads and rewrites.
    ///
    /// Returns `None` for opaque bodies, whose accesses are unknown.
    pub fn touched_accounts(&self) -> Option<Vec<AccountId>> {
        match self {
            Operation::Transfer { from, to, .. } => Some(vec![from.clone(), to.clone()]),
            Operation::Payroll { payer, payees } => {
                let mut accounts = Vec::with_capacity(payees.len() + 1);
                accounts.push(payer.clone());
                accounts.extend(payees.iter().map(|(payee, _)| payee.clone()));
                Some(accounts)
            }
            Operation::Liquidation {
                account,
                beneficiary,
            } => Some(vec![account.clone(), beneficiary.clone()]),
            Operation::Opaque(_) => None,
        }
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self, Operation::Opaque(_))
    }

    /// Short label used in logs and audit entries.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Transfer { .. } => "transfer",
            Operation::Payroll { .. } => "payroll",
            Operation::Liquidation { .. } => "liquidation",
            Operation::Opaque(_) => "opaque",
        }
    }
}

/// An immutable transaction submitted as part of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier.
    pub id: TxId,
    /// Accounts read, in declaration order.
    pub reads: Vec<AccountId>,
    /// Accounts written, in declaration order.
    pub writes: Vec<AccountId>,
    /// Operation body handed to the verifier.
    pub payload: Operation,
    /// Transactions that must be applied before this one.
    pub after: Vec<TxId>,
}

impl Transaction {
    pub fn new(id: impl Into<TxId>, payload: Operation) -> Self {
        Self {
            id: id.into(),
            reads: Vec::new(),
            writes: Vec::new(),
            payload,
            after: Vec::new(),
        }
    }

    /// Transfer with the conventional declaration: reads the source, writes
    /// both sides.
    pub fn transfer(
        id: impl Into<TxId>,
        from: impl Into<AccountId>,
        to: impl Into<AccountId>,
        amount: Balance,
    ) -> Self {
        let from = from.into();
        let to = to.into();
        Self::new(
            id,
            Operation::Transfer {
                from: from.clone(),
                to: to.clone(),
                amount,
            },
        )
        .with_reads(vec![from.clone()])
        .with_writes(vec![from, to])
    }

    pub fn with_reads(mut self, reads: Vec<AccountId>) -> Self {
        self.reads = reads;
        self
    }

    pub fn with_writes(mut self, writes: Vec<AccountId>) -> Self {
        self.writes = writes;
        self
    }

    pub fn with_prerequisites(mut self, after: Vec<TxId>) -> Self {
        self.after = after;
        self
    }

    /// Every account referenced by the declaration or the payload.
    pub fn referenced_accounts(&self) -> Vec<AccountId> {
        let mut accounts: Vec<AccountId> = self
            .reads
            .iter()
            .chain(self.writes.iter())
            .cloned()
            .collect();
        if let Some(touched) = self.payload.touched_accounts() {
            accounts.extend(touched);
        }
        accounts.sort();
        accounts.dedup();
        accounts
    }

    /// SHA-256 over the canonical bincode encoding.
    ///
    /// Commit records carry this digest so a log entry can be matched to the
    /// exact transaction content that produced it.
    pub fn digest(&self) -> Hash {
        let encoded = bincode::serialize(self).unwrap_or_default();
        Sha256::digest(&encoded).into()
    }
}

// =============================================================================
// CLUSTER C: STATE
// =============================================================================

/// Before/after image of a single account touched by a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMutation {
    pub account: AccountId,
    /// Balance before the mutation; `None` when the account did not exist.
    pub pre: Option<Balance>,
    /// Balance after the mutation.
    pub post: Balance,
}

impl AccountMutation {
    pub fn new(account: AccountId, pre: Option<Balance>, post: Balance) -> Self {
        Self { account, pre, post }
    }

    /// Net signed change carried by this mutation.
    pub fn delta(&self) -> AccountDelta {
        AccountDelta {
            account: self.account.clone(),
            amount: self.post as SignedAmount - self.pre.unwrap_or(0) as SignedAmount,
        }
    }
}

/// Signed balance change for one account, as seen by conservation checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDelta {
    pub account: AccountId,
    pub amount: SignedAmount,
}

/// Net effect of a set of deltas, merged per account and sorted by account.
pub fn net_deltas<'a>(deltas: impl IntoIterator<Item = &'a AccountDelta>) -> Vec<AccountDelta> {
    let mut merged: std::collections::BTreeMap<AccountId, SignedAmount> =
        std::collections::BTreeMap::new();
    for delta in deltas {
        *merged.entry(delta.account.clone()).or_insert(0) += delta.amount;
    }
    merged
        .into_iter()
        .map(|(account, amount)| AccountDelta { account, amount })
        .collect()
}
