//! Exclusive `fs2` lock on the data directory.

use super::security::{is_process_running, validate_lock_path, MAX_LOCK_AGE};
use crate::domain::errors::LockError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Exclusive lock on a data directory, released on drop.
///
/// The lock file holds the owner's PID so a lock left behind by a dead
/// process can be reclaimed.
#[derive(Debug)]
pub struct DataDirLock {
    file: File,
    path: PathBuf,
    pid: u32,
}

impl DataDirLock {
    const LOCK_FILE: &'static str = "LOCK";

    /// Acquire the lock, retrying with exponential backoff until `timeout`.
    ///
    /// # Errors
    ///
    /// `LockError::AlreadyLocked` if a live process still holds the lock
    /// when the timeout expires.
    pub fn acquire(data_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let deadline = Instant::now() + timeout;
        let lock_path = data_dir.join(Self::LOCK_FILE);
        let mut retry_delay = Duration::from_millis(10);

        loop {
            if lock_path.exists() && !validate_lock_path(data_dir, &lock_path) {
                return Err(LockError::CreateFailed(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "lock path escapes data directory",
                )));
            }

            if Self::is_lock_stale(&lock_path, MAX_LOCK_AGE) {
                warn!("[pl-03] Removing stale lock file {}", lock_path.display());
                let _ = std::fs::remove_file(&lock_path);
            }

            // Not truncated here: the holder's PID must survive a failed attempt
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .read(true)
                .write(true)
                .open(&lock_path)
                .map_err(LockError::CreateFailed)?;

            match file.try_lock_exclusive() {
                Ok(()) => {
                    let pid = std::process::id();
                    let mut locked = file;
                    locked.set_len(0).map_err(LockError::WriteFailed)?;
                    writeln!(locked, "{}", pid).map_err(LockError::WriteFailed)?;
                    locked.sync_all().map_err(LockError::WriteFailed)?;

                    debug!(pid, path = %lock_path.display(), "[pl-03] Data directory locked");
                    return Ok(Self {
                        file: locked,
                        path: lock_path,
                        pid,
                    });
                }
                Err(_) => {
                    let holder = Self::read_existing_pid(&lock_path);

                    if let Some(pid) = holder {
                        if pid != std::process::id() && !is_process_running(pid) {
                            drop(file);
                            let _ = std::fs::remove_file(&lock_path);
                            continue;
                        }
                    }

                    if Instant::now() >= deadline {
                        return Err(LockError::AlreadyLocked {
                            pid: holder,
                            path: lock_path,
                        });
                    }

                    drop(file);
                    std::thread::sleep(retry_delay);
                    retry_delay = (retry_delay * 2).min(Duration::from_millis(500));
                }
            }
        }
    }

    fn is_lock_stale(lock_path: &Path, max_age: Duration) -> bool {
        lock_path
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .and_then(|t| t.elapsed().ok())
            .map(|age| age > max_age)
            .unwrap_or(false)
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_existing_pid(path: &Path) -> Option<u32> {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }
}

impl Drop for DataDirLock {
    fn drop(&mut self) {
        #[allow(clippy::incompatible_msrv)]
        let _ = FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}
