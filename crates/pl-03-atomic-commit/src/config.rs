//! Configuration for the Atomic Commit Subsystem

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Commit manager configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommitConfig {
    /// Root of the WAL, state, checkpoint and audit files
    pub data_dir: PathBuf,
    /// Delete completed log records once their batch root is persisted
    pub compact_after_commit: bool,
    /// Snapshot the whole state after every commit
    pub checkpoint_after_commit: bool,
    /// Re-apply completed batches newer than the persisted root during
    /// recovery; when off they are rolled back instead
    pub replay_completed: bool,
    /// How long to wait for the data-directory lock
    pub lock_timeout_ms: u64,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./pl-data"),
            compact_after_commit: true,
            checkpoint_after_commit: true,
            replay_completed: true,
            lock_timeout_ms: 30_000,
        }
    }
}

impl CommitConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn wal_dir(&self) -> PathBuf {
        self.data_dir.join("wal")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.data_dir.join("state")
    }

    pub fn checkpoint_dir(&self) -> PathBuf {
        self.data_dir.join("checkpoint")
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.data_dir.join("audit.log")
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
