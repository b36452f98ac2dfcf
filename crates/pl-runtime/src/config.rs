//! # Engine Configuration
//!
//! One struct per stage, aggregated here, with environment overrides.

use pl_01_dependency_analysis::AnalysisConfig;
use pl_02_parallel_execution::{AtomicityMode, ExecutionConfig};
use pl_03_atomic_commit::CommitConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

/// Complete engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Dependency analysis limits.
    pub analysis: AnalysisConfig,
    /// Worker pool and atomicity.
    pub execution: ExecutionConfig,
    /// Data directory and durability knobs.
    pub commit: CommitConfig,
    /// Run crash recovery on open when the data directory needs it.
    pub recover_on_open: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig::default(),
            execution: ExecutionConfig::default(),
            commit: CommitConfig::default(),
            recover_on_open: true,
        }
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        Some(value) => match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(key, value = %value, "[pl-00] Ignoring unparsable setting");
                default
            }
        },
        None => default,
    }
}

fn flag_or(key: &str, raw: Option<String>, default: bool) -> bool {
    match raw.as_deref().map(str::trim) {
        Some("1") => true,
        Some("0") => false,
        Some(value) => parse_or(key, Some(value.to_ascii_lowercase()), default),
        None => default,
    }
}

impl EngineConfig {
    /// Engine over `data_dir` with every other setting at its default.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            commit: CommitConfig::new(data_dir),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `PL_DATA_DIR`: data directory (default: ./pl-data)
    /// - `PL_WORKER_THREADS`: worker pool size, 0 for one per core
    /// - `PL_MAX_BATCH_SIZE`: largest accepted batch
    /// - `PL_ATOMICITY`: `all-or-nothing` or `best-effort`
    /// - `PL_BATCH_CONSERVATION`: check the batch's net effect too
    /// - `PL_COMPACT_AFTER_COMMIT`: delete completed log records
    /// - `PL_RECOVER_ON_OPEN`: recover automatically at startup
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`] over an arbitrary lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("PL_DATA_DIR").filter(|d| !d.trim().is_empty()) {
            config.commit.data_dir = PathBuf::from(dir);
        }

        config.execution.worker_threads = parse_or(
            "PL_WORKER_THREADS",
            lookup("PL_WORKER_THREADS"),
            config.execution.worker_threads,
        );

        config.analysis.max_batch_size = parse_or(
            "PL_MAX_BATCH_SIZE",
            lookup("PL_MAX_BATCH_SIZE"),
            config.analysis.max_batch_size,
        );

        if let Some(raw) = lookup("PL_ATOMICITY") {
            match AtomicityMode::parse(&raw) {
                Some(mode) => config.execution.atomicity = mode,
                None => warn!(value = %raw, "[pl-00] Unknown atomicity mode, keeping default"),
            }
        }

        config.execution.batch_conservation = flag_or(
            "PL_BATCH_CONSERVATION",
            lookup("PL_BATCH_CONSERVATION"),
            config.execution.batch_conservation,
        );

        config.commit.compact_after_commit = flag_or(
            "PL_COMPACT_AFTER_COMMIT",
            lookup("PL_COMPACT_AFTER_COMMIT"),
            config.commit.compact_after_commit,
        );

        config.recover_on_open = flag_or(
            "PL_RECOVER_ON_OPEN",
            lookup("PL_RECOVER_ON_OPEN"),
            config.recover_on_open,
        );

        config
    }
}
