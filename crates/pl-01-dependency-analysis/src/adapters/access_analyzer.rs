//! Conservative Access Analyzer Adapter
//!
//! Implements `AccessAnalyzer` from the declared sets plus the operation body.

use crate::domain::errors::{AnalysisError, MalformedReason};
use crate::domain::value_objects::AccessSet;
use crate::ports::outbound::AccessAnalyzer;
use shared_types::{Operation, Transaction};
use tracing::debug;

/// Widens declared access sets so that no real conflict can be missed.
///
/// - Accounts touched by a structured operation are read and rewritten, so
///   they land in both sets.
/// - Declared reads the operation does not touch stay reads.
/// - Declared writes stay writes.
/// - For `Opaque` bodies nothing can be separated: every declared account is
///   read+write.
#[derive(Debug, Default, Clone)]
pub struct ConservativeAccessAnalyzer;

impl ConservativeAccessAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn check_operation(tx: &Transaction) -> Result<(), AnalysisError> {
        let malformed = |reason| AnalysisError::MalformedTransaction { tx: tx.id, reason };

        match &tx.payload {
            Operation::Transfer { from, to, amount } => {
                if *amount == 0 {
                    return Err(malformed(MalformedReason::ZeroAmount));
                }
                if from == to {
                    return Err(malformed(MalformedReason::SelfTransfer));
                }
            }
            Operation::Payroll { payer, payees } => {
                if payees.is_empty() || payees.iter().any(|(_, amount)| *amount == 0) {
                    return Err(malformed(MalformedReason::ZeroAmount));
                }
                if payees.iter().any(|(payee, _)| payee == payer) {
                    return Err(malformed(MalformedReason::SelfTransfer));
                }
            }
            Operation::Liquidation {
                account,
                beneficiary,
            } => {
                if account == beneficiary {
                    return Err(malformed(MalformedReason::SelfTransfer));
                }
            }
            Operation::Opaque(_) => {}
        }

        Ok(())
    }
}

impl AccessAnalyzer for ConservativeAccessAnalyzer {
    fn analyze(&self, tx: &Transaction) -> Result<AccessSet, AnalysisError> {
        if tx.reads.is_empty() && tx.writes.is_empty() {
            return Err(AnalysisError::MalformedTransaction {
                tx: tx.id,
                reason: MalformedReason::EmptyAccessSet,
            });
        }

        Self::check_operation(tx)?;

        let mut access = AccessSet::new()
            .with_reads(tx.reads.iter().cloned())
            .with_writes(tx.writes.iter().cloned());

        match tx.payload.touched_accounts() {
            Some(touched) => {
                access.reads.extend(touched.iter().cloned());
                access.writes.extend(touched);
            }
            None => {
                let declared = access.touched();
                access.reads.extend(declared.iter().cloned());
                access.writes.extend(declared);
            }
        }

        debug!(
            "[pl-01] {} ({}) reads {} writes {}",
            tx.id,
            tx.payload.kind(),
            access.reads.len(),
            access.writes.len()
        );

        Ok(access)
    }
}
