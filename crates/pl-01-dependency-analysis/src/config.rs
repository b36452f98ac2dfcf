//! Configuration for the Dependency Analysis Subsystem

use serde::{Deserialize, Serialize};

/// Analysis configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Maximum transactions accepted in one batch
    pub max_batch_size: usize,
    /// Maximum edges in the dependency graph (anti-DoS)
    pub max_edge_count: usize,
    /// Reject transactions touching accounts unknown to the directory
    pub require_known_accounts: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 1000,
            max_edge_count: 100_000,
            require_known_accounts: true,
        }
    }
}
