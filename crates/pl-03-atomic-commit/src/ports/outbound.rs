//! Outbound ports (Driven side)

use crate::domain::errors::StoreError;
use crate::domain::recovery::AuditEntry;

/// Abstract interface for checksum operations.
pub trait ChecksumProvider: Send + Sync {
    /// Compute CRC32 checksum of data.
    fn compute_crc32(&self, data: &[u8]) -> u32;

    /// Verify CRC32 checksum matches.
    fn verify_crc32(&self, data: &[u8], expected: u32) -> bool {
        self.compute_crc32(data) == expected
    }
}

/// Abstract interface for time operations (for testability).
pub trait TimeSource: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

/// Append-only, timestamped record of commit and recovery actions.
///
/// Callers treat a failed append as non-fatal.
pub trait AuditSink: Send + Sync {
    fn append(&self, entry: &AuditEntry) -> Result<(), StoreError>;
}
