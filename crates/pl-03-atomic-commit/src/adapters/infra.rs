//! Infrastructure adapters: checksums, wall clock and durable file writes.

use crate::domain::errors::StoreError;
use crate::ports::outbound::{ChecksumProvider, TimeSource};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Suffix of files written but not yet renamed into place
pub const TEMP_SUFFIX: &str = "tmp";

/// Default checksum provider using crc32fast.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultChecksumProvider;

impl ChecksumProvider for DefaultChecksumProvider {
    fn compute_crc32(&self, data: &[u8]) -> u32 {
        crc32fast::hash(data)
    }
}

/// Default time source using system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Append a little-endian CRC32 trailer to `payload`.
pub fn seal(checksum: &impl ChecksumProvider, mut payload: Vec<u8>) -> Vec<u8> {
    let crc = checksum.compute_crc32(&payload);
    payload.extend_from_slice(&crc.to_le_bytes());
    payload
}

/// Strip and verify the CRC32 trailer added by [`seal`].
pub fn unseal<'a>(
    checksum: &impl ChecksumProvider,
    path: &Path,
    bytes: &'a [u8],
) -> Result<&'a [u8], StoreError> {
    if bytes.len() < 4 {
        return Err(StoreError::corrupt(path, "truncated checksum trailer"));
    }
    let (payload, trailer) = bytes.split_at(bytes.len() - 4);
    let mut crc = [0u8; 4];
    crc.copy_from_slice(trailer);
    if !checksum.verify_crc32(payload, u32::from_le_bytes(crc)) {
        return Err(StoreError::corrupt(path, "checksum mismatch"));
    }
    Ok(payload)
}

/// Path of the temporary sibling used by [`write_atomic`].
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(TEMP_SUFFIX);
    path.with_file_name(name)
}

/// Write atomically via temp file: write, fsync, rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let temp = temp_path(path);
    let mut file = File::create(&temp).map_err(|e| StoreError::io(&temp, e))?;
    file.write_all(bytes).map_err(|e| StoreError::io(&temp, e))?;
    file.sync_all().map_err(|e| StoreError::io(&temp, e))?;
    fs::rename(&temp, path).map_err(|e| StoreError::io(path, e))?;
    sync_dir(path.parent());
    Ok(())
}

/// Best-effort fsync of a directory so renames and unlinks are durable.
pub fn sync_dir(dir: Option<&Path>) {
    if !cfg!(unix) {
        return;
    }
    if let Some(handle) = dir.and_then(|dir| File::open(dir).ok()) {
        let _ = handle.sync_all();
    }
}

/// Read a whole file; `Ok(None)` when it does not exist.
pub fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Remove a file, treating "already gone" as success.
pub fn remove_if_exists(path: &Path) -> Result<bool, StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Delete every `*.tmp` file directly inside `dir`; returns what was removed.
pub fn remove_temp_files(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
        Err(e) => return Err(StoreError::io(dir, e)),
    };

    let mut removed = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| StoreError::io(dir, e))?.path();
        if path.extension().is_some_and(|ext| ext == TEMP_SUFFIX) && path.is_file() {
            fs::remove_file(&path).map_err(|e| StoreError::io(&path, e))?;
            removed.push(path);
        }
    }
    removed.sort();
    if !removed.is_empty() {
        sync_dir(Some(dir));
    }
    Ok(removed)
}
