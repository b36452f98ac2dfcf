//! Value objects for Parallel Execution

use serde::{Deserialize, Serialize};
use std::fmt;

/// How transaction failures affect the rest of the batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AtomicityMode {
    /// Any failure in the main segment aborts the whole batch.
    #[default]
    AllOrNothing,
    /// Failed transactions are discarded; the rest of the batch proceeds.
    BestEffort,
}

impl AtomicityMode {
    /// Parse the configuration spelling (`all-or-nothing` / `best-effort`).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all-or-nothing" | "all_or_nothing" | "atomic" => Some(AtomicityMode::AllOrNothing),
            "best-effort" | "best_effort" => Some(AtomicityMode::BestEffort),
            _ => None,
        }
    }
}

/// Isolated run a transaction belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Segment {
    /// Regular transactions, executed first.
    Main,
    /// Suspicious transactions and everything downstream of them.
    Quarantine,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Main => f.write_str("main"),
            Segment::Quarantine => f.write_str("quarantine"),
        }
    }
}
