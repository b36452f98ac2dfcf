//! In-memory account directory

use crate::ports::outbound::AccountDirectory;
use parking_lot::RwLock;
use shared_types::AccountId;
use std::collections::BTreeSet;

/// Account directory backed by a set, refreshed by the owner of the ledger
/// state after every commit.
#[derive(Debug, Default)]
pub struct InMemoryAccountDirectory {
    accounts: RwLock<BTreeSet<AccountId>>,
}

impl InMemoryAccountDirectory {
    pub fn new(accounts: impl IntoIterator<Item = AccountId>) -> Self {
        Self {
            accounts: RwLock::new(accounts.into_iter().collect()),
        }
    }

    /// Replace the known accounts.
    pub fn replace(&self, accounts: impl IntoIterator<Item = AccountId>) {
        *self.accounts.write() = accounts.into_iter().collect();
    }

    pub fn insert(&self, account: AccountId) {
        self.accounts.write().insert(account);
    }

    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }
}

impl AccountDirectory for InMemoryAccountDirectory {
    fn contains(&self, account: &AccountId) -> bool {
        self.accounts.read().contains(account)
    }
}
