//! # PL-02: Parallel Execution Subsystem
//!
//! Executes an analyzed batch wave by wave on a fixed-size worker pool and
//! audits the result.
//!
//! ## Responsibilities
//!
//! - Run waves strictly in order, transactions of a wave concurrently
//! - Call the external Verifier and Conservation check for every transaction
//! - Enforce batch atomicity (all-or-nothing by default, best-effort opt-in)
//! - Isolate transactions flagged by the security screen in a quarantine
//!   segment whose failure does not block the rest of the batch
//! - Prove, after the fact, that every dependency edge was honoured
//!
//! ## Architecture
//!
//! - **Domain**: outcomes, trace, execution errors
//! - **Algorithms**: state transitions, quarantine split, linearizability audit
//! - **Ports**: Inbound (ParallelExecutionApi) and Outbound (Verifier,
//!   ConservationChecker, SecurityScreen)
//! - **Adapters**: default checks, versioned quarantine rules
//! - **Application**: the rayon-backed executor

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use adapters::{
    AcceptAllVerifier, NoQuarantine, QuarantineRule, QuarantineRules, RuleBasedScreen, RuleSet,
    ZeroSumConservation,
};
pub use algorithms::{prove_linearizable, LinearizabilityCertificate};
pub use application::ParallelExecutor;
pub use config::ExecutionConfig;
pub use domain::entities::*;
pub use domain::errors::{ConservationViolation, ExecutionError, TxFailure, VerificationRejection};
pub use domain::value_objects::{AtomicityMode, Segment};
pub use ports::inbound::ParallelExecutionApi;
pub use ports::outbound::{ConservationChecker, SecurityScreen, Verifier};
