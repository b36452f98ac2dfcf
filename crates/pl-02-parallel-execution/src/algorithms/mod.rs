//! Algorithms module for Parallel Execution
//!
//! Contains:
//! - Built-in state transitions
//! - Quarantine taint closure and segment split
//! - Linearizability audit

pub mod linearizability;
pub mod quarantine_split;
pub mod transition;

pub use linearizability::{prove_linearizable, LinearizabilityCertificate};
pub use quarantine_split::{split_schedule, taint_closure};
pub use transition::apply_operation;
