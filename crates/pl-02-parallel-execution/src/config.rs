//! Configuration for the Parallel Execution Subsystem

use crate::domain::value_objects::AtomicityMode;
use serde::{Deserialize, Serialize};

/// Waves smaller than this run on the calling thread.
pub const PARALLEL_THRESHOLD: usize = 4;

/// Executor configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Worker threads in the pool; 0 lets rayon pick one per core
    pub worker_threads: usize,
    /// Failure policy for the main segment
    pub atomicity: AtomicityMode,
    /// Also run the conservation check over the batch's net effect
    pub batch_conservation: bool,
    /// Minimum wave size dispatched to the pool
    pub parallel_threshold: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            atomicity: AtomicityMode::AllOrNothing,
            batch_conservation: true,
            parallel_threshold: PARALLEL_THRESHOLD,
        }
    }
}
