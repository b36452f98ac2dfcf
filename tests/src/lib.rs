//! # Parallel-Ledger Test Suite
//!
//! Cross-crate tests that need more than one subsystem.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Engines, batches, custom collaborators
//! ├── integration/      # End-to-end pipeline, atomicity, crash safety
//! └── properties/       # proptest: completeness, determinism, cycles
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p pl-tests
//!
//! # By category
//! cargo test -p pl-tests integration::
//! cargo test -p pl-tests properties::
//!
//! # Benchmarks
//! cargo bench -p pl-tests
//! ```

#![allow(dead_code)]

pub mod fixtures;
pub mod integration;
pub mod properties;
