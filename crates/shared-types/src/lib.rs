//! # Shared Types Crate
//!
//! This crate contains the domain entities exchanged between the subsystems
//! of the batch pipeline.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Immutability**: A `Transaction` is never mutated after submission; the
//!   pipeline only reads it.
//! - **Explicit Absence**: A pre-image of `None` means the account did not
//!   exist before the mutation, which is distinct from a zero balance.

pub mod entities;
pub mod signal;

pub use entities::*;
pub use signal::AbortSignal;
