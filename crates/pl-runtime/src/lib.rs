//! # Parallel-Ledger Runtime
//!
//! Batch submission API over the three subsystems:
//!
//! 1. Dependency Analysis (pl-01): graph, conflicts, wave schedule
//! 2. Parallel Execution (pl-02): wave-by-wave execution and the
//!    linearizability audit
//! 3. Atomic Commit (pl-03): write-ahead log, state root, recovery
//!
//! ```rust,ignore
//! use pl_runtime::{BatchEngine, EngineConfig};
//!
//! let engine = BatchEngine::open(EngineConfig::from_env())?;
//! engine.seed_accounts(vec![("alice".into(), 100), ("bob".into(), 0)])?;
//! let report = engine.submit(vec![Transaction::transfer(1, "alice", "bob", 30)])?;
//! println!("root {}", report.receipt.root_hex());
//! ```

pub mod config;
pub mod engine;
pub mod errors;
pub mod report;

pub use config::EngineConfig;
pub use engine::BatchEngine;
pub use errors::EngineError;
pub use report::BatchReport;
