//! Stale-lock detection helpers.

use std::path::Path;
use std::time::Duration;

/// Default time to wait for a held lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// A lock file untouched for longer than this is considered abandoned.
pub const MAX_LOCK_AGE: Duration = Duration::from_secs(86400);

/// Whether a process with the given PID is alive.
pub fn is_process_running(pid: u32) -> bool {
    #[cfg(unix)]
    {
        Path::new(&format!("/proc/{}", pid)).exists()
    }

    #[cfg(not(unix))]
    {
        let _ = pid;
        true
    }
}

/// Whether `lock_path` resolves inside `data_dir`.
pub fn validate_lock_path(data_dir: &Path, lock_path: &Path) -> bool {
    lock_path
        .canonicalize()
        .ok()
        .and_then(|canonical| {
            data_dir
                .canonicalize()
                .ok()
                .map(|data_canonical| canonical.starts_with(&data_canonical))
        })
        .unwrap_or(false)
}
