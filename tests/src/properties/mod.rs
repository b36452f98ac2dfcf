//! # Property Tests
//!
//! Randomised batches checked against the three scheduling guarantees.

mod completeness;
mod cycles;
mod determinism;
