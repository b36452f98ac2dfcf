//! # Adapters Layer (Hexagonal Architecture)
//!
//! Default implementations of the executor's outbound ports.

mod checks;
mod quarantine;

pub use checks::{AcceptAllVerifier, ZeroSumConservation};
pub use quarantine::{NoQuarantine, QuarantineRule, QuarantineRules, RuleBasedScreen, RuleSet};
