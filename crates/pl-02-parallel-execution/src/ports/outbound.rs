//! # Driven Ports (SPI - Outbound)
//!
//! Narrow collaborators injected into the executor:
//! - Verifier: business-rule acceptance of a transaction
//! - Conservation: balance-preservation check over account deltas
//! - Security screen: flags transactions for the quarantine segment
//!
//! All of them are called from worker threads and must be `Send + Sync`.

use crate::domain::errors::{ConservationViolation, VerificationRejection};
use shared_types::{AccountDelta, Transaction};

/// External transaction verifier.
pub trait Verifier: Send + Sync {
    /// Accept or reject `tx`. The payload is passed through untouched.
    fn verify(&self, tx: &Transaction) -> Result<(), VerificationRejection>;
}

/// External conservation check.
pub trait ConservationChecker: Send + Sync {
    /// Check that `deltas` preserve the ledger's invariants.
    ///
    /// Called once per transaction and, when enabled, once over the net
    /// effect of the whole batch.
    fn check_conservation(&self, deltas: &[AccountDelta]) -> Result<(), ConservationViolation>;
}

/// Security collaborator deciding which transactions run in quarantine.
pub trait SecurityScreen: Send + Sync {
    /// Reason for isolating `tx`, or `None` if it may run normally.
    fn screen(&self, tx: &Transaction) -> Option<String>;
}

impl<T: Verifier + ?Sized> Verifier for std::sync::Arc<T> {
    fn verify(&self, tx: &Transaction) -> Result<(), VerificationRejection> {
        (**self).verify(tx)
    }
}

impl<T: ConservationChecker + ?Sized> ConservationChecker for std::sync::Arc<T> {
    fn check_conservation(&self, deltas: &[AccountDelta]) -> Result<(), ConservationViolation> {
        (**self).check_conservation(deltas)
    }
}

impl<T: SecurityScreen + ?Sized> SecurityScreen for std::sync::Arc<T> {
    fn screen(&self, tx: &Transaction) -> Option<String> {
        (**self).screen(tx)
    }
}
