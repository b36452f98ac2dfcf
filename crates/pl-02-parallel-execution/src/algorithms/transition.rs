//! Built-in state transitions
//!
//! Each structured operation maps a read-only balance sheet to the pre/post
//! images of the accounts it rewrites. Nothing here mutates shared state, so
//! workers of one wave can call it concurrently.

use crate::domain::errors::TxFailure;
use shared_types::{AccountId, AccountMutation, Balance, BalanceSheet, Operation, Transaction};
use std::collections::BTreeMap;

/// Compute the mutations `tx` would apply on top of `state`.
///
/// `Opaque` bodies have no built-in transition and yield no mutations.
pub fn apply_operation(
    tx: &Transaction,
    state: &BalanceSheet,
) -> Result<Vec<AccountMutation>, TxFailure> {
    // Net signed change per account, applied in one step at the end
    let mut credits: BTreeMap<AccountId, Balance> = BTreeMap::new();
    let mut debits: BTreeMap<AccountId, Balance> = BTreeMap::new();

    match &tx.payload {
        Operation::Transfer { from, to, amount } => {
            add(&mut debits, from, *amount)?;
            add(&mut credits, to, *amount)?;
        }
        Operation::Payroll { payer, payees } => {
            for (payee, amount) in payees {
                add(&mut debits, payer, *amount)?;
                add(&mut credits, payee, *amount)?;
            }
        }
        Operation::Liquidation {
            account,
            beneficiary,
        } => {
            let balance = balance_of(state, account)?;
            add(&mut debits, account, balance)?;
            add(&mut credits, beneficiary, balance)?;
        }
        Operation::Opaque(_) => return Ok(Vec::new()),
    }

    let mut touched: Vec<&AccountId> = debits.keys().chain(credits.keys()).collect();
    touched.sort();
    touched.dedup();

    let mut mutations = Vec::with_capacity(touched.len());
    for account in touched {
        let pre = balance_of(state, account)?;
        let debit = debits.get(account).copied().unwrap_or(0);
        let credit = credits.get(account).copied().unwrap_or(0);

        let funded = pre
            .checked_add(credit)
            .ok_or_else(|| TxFailure::Overflow(account.clone()))?;
        let post = funded
            .checked_sub(debit)
            .ok_or_else(|| TxFailure::InsufficientFunds {
                account: account.clone(),
                balance: pre,
                required: debit,
            })?;

        mutations.push(AccountMutation::new(account.clone(), Some(pre), post));
    }

    Ok(mutations)
}

fn balance_of(state: &BalanceSheet, account: &AccountId) -> Result<Balance, TxFailure> {
    state
        .get(account)
        .copied()
        .ok_or_else(|| TxFailure::MissingAccount(account.clone()))
}

fn add(
    totals: &mut BTreeMap<AccountId, Balance>,
    account: &AccountId,
    amount: Balance,
) -> Result<(), TxFailure> {
    let entry = totals.entry(account.clone()).or_insert(0);
    *entry = entry
        .checked_add(amount)
        .ok_or_else(|| TxFailure::Overflow(account.clone()))?;
    Ok(())
}
