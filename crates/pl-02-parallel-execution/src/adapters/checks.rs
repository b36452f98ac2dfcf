//! Default verifier and conservation adapters

use crate::domain::errors::{ConservationViolation, VerificationRejection};
use crate::ports::outbound::{ConservationChecker, Verifier};
use shared_types::{AccountDelta, SignedAmount, Transaction};

/// Verifier that accepts every transaction.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAllVerifier;

impl Verifier for AcceptAllVerifier {
    fn verify(&self, _tx: &Transaction) -> Result<(), VerificationRejection> {
        Ok(())
    }
}

/// Conservation check requiring the deltas to sum to zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZeroSumConservation;

impl ConservationChecker for ZeroSumConservation {
    fn check_conservation(&self, deltas: &[AccountDelta]) -> Result<(), ConservationViolation> {
        let mut total: SignedAmount = 0;
        for delta in deltas {
            total = total
                .checked_add(delta.amount)
                .ok_or_else(|| ConservationViolation::new("delta sum overflows"))?;
        }

        if total != 0 {
            return Err(ConservationViolation::new(format!(
                "deltas over {} accounts sum to {}",
                deltas.len(),
                total
            )));
        }

        Ok(())
    }
}
