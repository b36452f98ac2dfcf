//! Quarantine rules
//!
//! Rule sets are immutable and versioned. The live set sits behind a
//! `parking_lot::RwLock<Arc<RuleSet>>`: readers clone the `Arc` under a
//! recursive read lock and release it at once, so a rule update only swaps
//! the pointer and never waits on a screening in progress. Every published
//! version is kept in an append-only history.

use crate::ports::outbound::SecurityScreen;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shared_types::{AccountId, Balance, Operation, Transaction};
use std::sync::Arc;
use tracing::info;

/// A single screening rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuarantineRule {
    /// Isolate anything touching this account
    DenyAccount(AccountId),
    /// Isolate transfers and payrolls moving more than this amount
    MaxAmount(Balance),
    /// Isolate operations with unknown semantics
    DenyOpaque,
}

impl QuarantineRule {
    fn matches(&self, tx: &Transaction) -> Option<String> {
        match self {
            QuarantineRule::DenyAccount(account) => tx
                .referenced_accounts()
                .contains(account)
                .then(|| format!("touches denied account {}", account)),
            QuarantineRule::MaxAmount(limit) => {
                let moved = match &tx.payload {
                    Operation::Transfer { amount, .. } => Some(*amount),
                    Operation::Payroll { payees, .. } => payees
                        .iter()
                        .try_fold(0 as Balance, |sum, (_, amount)| sum.checked_add(*amount))
                        .or(Some(Balance::MAX)),
                    _ => None,
                };
                moved
                    .filter(|amount| amount > limit)
                    .map(|amount| format!("moves {} above limit {}", amount, limit))
            }
            QuarantineRule::DenyOpaque => tx
                .payload
                .is_opaque()
                .then(|| "opaque operation".to_string()),
        }
    }
}

/// Immutable, versioned snapshot of the rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    pub version: u64,
    pub rules: Vec<QuarantineRule>,
}

impl RuleSet {
    /// First matching rule's reason
    pub fn evaluate(&self, tx: &Transaction) -> Option<String> {
        self.rules.iter().find_map(|rule| rule.matches(tx))
    }
}

/// Live quarantine rules with version history.
#[derive(Debug)]
pub struct QuarantineRules {
    current: RwLock<Arc<RuleSet>>,
    history: RwLock<Vec<Arc<RuleSet>>>,
}

impl QuarantineRules {
    pub fn new(rules: Vec<QuarantineRule>) -> Self {
        let initial = Arc::new(RuleSet { version: 0, rules });
        Self {
            current: RwLock::new(Arc::clone(&initial)),
            history: RwLock::new(vec![initial]),
        }
    }

    /// The live rule set.
    ///
    /// Recursive read: a screen may call back in while already holding a
    /// snapshot without deadlocking behind a queued writer.
    pub fn snapshot(&self) -> Arc<RuleSet> {
        Arc::clone(&self.current.read_recursive())
    }

    /// Publish a new rule set and return its version.
    pub fn publish(&self, rules: Vec<QuarantineRule>) -> u64 {
        let mut history = self.history.write();
        let version = history.len() as u64;
        let next = Arc::new(RuleSet { version, rules });
        history.push(Arc::clone(&next));
        *self.current.write() = next;

        info!(version, "[pl-02] Quarantine rules updated");
        version
    }

    /// Derive the next version from the live one.
    pub fn update(&self, f: impl FnOnce(&mut Vec<QuarantineRule>)) -> u64 {
        let mut rules = self.snapshot().rules.clone();
        f(&mut rules);
        self.publish(rules)
    }

    /// A past version, if it exists
    pub fn version(&self, version: u64) -> Option<Arc<RuleSet>> {
        self.history.read_recursive().get(version as usize).cloned()
    }

    pub fn history_len(&self) -> usize {
        self.history.read_recursive().len()
    }
}

impl Default for QuarantineRules {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Screen backed by [`QuarantineRules`].
#[derive(Debug, Clone)]
pub struct RuleBasedScreen {
    rules: Arc<QuarantineRules>,
}

impl RuleBasedScreen {
    pub fn new(rules: Arc<QuarantineRules>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &Arc<QuarantineRules> {
        &self.rules
    }
}

impl SecurityScreen for RuleBasedScreen {
    fn screen(&self, tx: &Transaction) -> Option<String> {
        self.rules.snapshot().evaluate(tx)
    }
}

/// Screen that never isolates anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoQuarantine;

impl SecurityScreen for NoQuarantine {
    fn screen(&self, _tx: &Transaction) -> Option<String> {
        None
    }
}
