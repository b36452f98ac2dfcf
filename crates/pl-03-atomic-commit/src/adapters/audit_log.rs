//! Audit log adapters.

use crate::domain::errors::StoreError;
use crate::domain::recovery::AuditEntry;
use crate::ports::outbound::AuditSink;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only JSON-lines audit file.
pub struct FileAuditLog {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl FileAuditLog {
    /// The file is opened lazily so an unwritable log never blocks startup.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse every line written so far.
    pub fn read_entries(&self) -> Result<Vec<AuditEntry>, StoreError> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line)
                    .map_err(|e| StoreError::corrupt(&self.path, e.to_string()))
            })
            .collect()
    }
}

impl AuditSink for FileAuditLog {
    fn append(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        let mut line =
            serde_json::to_vec(entry).map_err(|e| StoreError::Encoding(e.to_string()))?;
        line.push(b'\n');

        let mut guard = self.file.lock();
        if guard.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .map_err(|e| StoreError::io(&self.path, e))?;
            *guard = Some(file);
        }
        let Some(file) = guard.as_mut() else {
            return Ok(());
        };

        let written = file.write_all(&line).and_then(|_| file.sync_data());
        if let Err(e) = written {
            *guard = None;
            return Err(StoreError::io(&self.path, e));
        }
        Ok(())
    }
}

/// In-memory audit sink; can be told to fail.
#[derive(Default)]
pub struct MemoryAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
    failing: std::sync::atomic::AtomicBool,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }

    /// Make every following append fail
    pub fn set_failing(&self, failing: bool) {
        self.failing
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }
}

impl AuditSink for MemoryAuditLog {
    fn append(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StoreError::Io {
                path: PathBuf::from("<memory>"),
                message: "audit sink unavailable".to_string(),
            });
        }
        self.entries.lock().push(entry.clone());
        Ok(())
    }
}

impl<T: AuditSink + ?Sized> AuditSink for std::sync::Arc<T> {
    fn append(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        (**self).append(entry)
    }
}
