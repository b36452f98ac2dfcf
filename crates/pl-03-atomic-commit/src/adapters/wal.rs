//! # Write-Ahead Log
//!
//! One file per record under `wal/`, named by its zero-padded sequence
//! number so directory order is log order.
//!
//! ## Record Layout
//!
//! `bincode(CommitRecord) || SHA-256(bincode(CommitRecord))`
//!
//! A record is written once with `create_new` and fsynced. Setting its
//! completion flag rewrites it through a temp file and a rename, so a crash
//! leaves either the old or the new record, never a mix. A torn first write
//! fails the content hash and is reported as corrupt.

use super::infra::{remove_if_exists, remove_temp_files, sync_dir, write_atomic};
use crate::domain::entities::CommitRecord;
use crate::domain::errors::StoreError;
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const RECORD_EXTENSION: &str = "rec";
const HASH_LEN: usize = 32;

/// Outcome of reading the whole log.
#[derive(Debug, Default)]
pub struct WalScan {
    /// Valid records, ascending by sequence number
    pub records: Vec<CommitRecord>,
    /// Files that failed decoding or their content hash
    pub corrupt: Vec<PathBuf>,
}

/// Append-only, sequence-numbered log of commit records.
pub struct WriteAheadLog {
    dir: PathBuf,
    /// Single writer lock; guards the next sequence number
    next_seq: Mutex<u64>,
}

impl WriteAheadLog {
    /// Open (creating if needed) the log directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let highest = Self::list_sequences(&dir)?.into_iter().max().unwrap_or(0);
        debug!(dir = %dir.display(), next_seq = highest + 1, "[pl-03] WAL opened");

        Ok(Self {
            dir,
            next_seq: Mutex::new(highest + 1),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Sequence number the next append will receive
    pub fn next_seq(&self) -> u64 {
        *self.next_seq.lock()
    }

    fn record_path(&self, seq: u64) -> PathBuf {
        self.dir.join(format!("{seq:020}.{RECORD_EXTENSION}"))
    }

    fn encode(record: &CommitRecord) -> Result<Vec<u8>, StoreError> {
        let mut bytes =
            bincode::serialize(record).map_err(|e| StoreError::Encoding(e.to_string()))?;
        bytes.extend_from_slice(&record.content_hash());
        Ok(bytes)
    }

    fn decode(path: &Path, bytes: &[u8]) -> Result<CommitRecord, StoreError> {
        if bytes.len() <= HASH_LEN {
            return Err(StoreError::corrupt(path, "truncated record"));
        }
        let (body, hash) = bytes.split_at(bytes.len() - HASH_LEN);
        let record: CommitRecord = bincode::deserialize(body)
            .map_err(|e| StoreError::corrupt(path, format!("undecodable record: {e}")))?;
        if record.content_hash().as_slice() != hash {
            return Err(StoreError::corrupt(path, "content hash mismatch"));
        }
        Ok(record)
    }

    /// Assign the next sequence number to `record`, write and fsync it.
    pub fn append(&self, mut record: CommitRecord) -> Result<CommitRecord, StoreError> {
        let mut next_seq = self.next_seq.lock();
        record.seq = *next_seq;

        let path = self.record_path(record.seq);
        let bytes = Self::encode(&record)?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))?;
        let written = file.write_all(&bytes).and_then(|_| file.sync_all());
        if let Err(e) = written {
            drop(file);
            let _ = fs::remove_file(&path);
            return Err(StoreError::io(&path, e));
        }

        *next_seq += 1;
        Ok(record)
    }

    /// Never hand out a sequence number below `next`
    pub fn advance_to(&self, next: u64) {
        let mut next_seq = self.next_seq.lock();
        if *next_seq < next {
            *next_seq = next;
        }
    }

    /// Highest sequence number handed out so far
    pub fn last_seq(&self) -> u64 {
        self.next_seq().saturating_sub(1)
    }

    /// fsync the directory so every appended file name is durable
    pub fn flush(&self) {
        sync_dir(Some(&self.dir));
    }

    /// Persist the completion flag of an already logged record.
    pub fn mark_completed(&self, record: &CommitRecord) -> Result<(), StoreError> {
        let mut completed = record.clone();
        completed.completed = true;
        write_atomic(&self.record_path(completed.seq), &Self::encode(&completed)?)
    }

    /// Read every record file.
    pub fn scan(&self) -> Result<WalScan, StoreError> {
        let mut scan = WalScan::default();

        for seq in Self::list_sequences(&self.dir)? {
            let path = self.record_path(seq);
            let bytes = fs::read(&path).map_err(|e| StoreError::io(&path, e))?;
            match Self::decode(&path, &bytes) {
                Ok(record) if record.seq == seq => scan.records.push(record),
                Ok(_) => scan.corrupt.push(path),
                Err(e) => {
                    warn!("[pl-03] {}", e);
                    scan.corrupt.push(path);
                }
            }
        }

        Ok(scan)
    }

    /// Delete one record file by sequence number
    pub fn remove(&self, seq: u64) -> Result<bool, StoreError> {
        remove_if_exists(&self.record_path(seq))
    }

    /// Delete a file reported corrupt by [`scan`](Self::scan)
    pub fn discard(&self, path: &Path) -> Result<bool, StoreError> {
        remove_if_exists(path)
    }

    /// Delete every record whose batch satisfies `predicate`.
    fn remove_where(
        &self,
        predicate: impl Fn(&CommitRecord) -> bool,
    ) -> Result<usize, StoreError> {
        let scan = self.scan()?;
        let mut removed = 0;
        for record in scan.records.iter().filter(|r| predicate(r)) {
            if self.remove(record.seq)? {
                removed += 1;
            }
        }
        if removed > 0 {
            sync_dir(Some(&self.dir));
        }
        Ok(removed)
    }

    /// Drop completed records of batches at or below `batch_seq`.
    pub fn compact(&self, batch_seq: u64) -> Result<usize, StoreError> {
        self.remove_where(|record| record.completed && record.batch_seq <= batch_seq)
    }

    /// Drop every record of batches above `batch_seq`.
    pub fn truncate_after(&self, batch_seq: u64) -> Result<usize, StoreError> {
        self.remove_where(|record| record.batch_seq > batch_seq)
    }

    pub fn clean_temp_files(&self) -> Result<Vec<PathBuf>, StoreError> {
        remove_temp_files(&self.dir)
    }

    fn list_sequences(dir: &Path) -> Result<Vec<u64>, StoreError> {
        let mut sequences = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| StoreError::io(dir, e))? {
            let path = entry.map_err(|e| StoreError::io(dir, e))?.path();
            if path.extension().is_some_and(|ext| ext == RECORD_EXTENSION) {
                if let Some(seq) = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .and_then(|stem| stem.parse::<u64>().ok())
                {
                    sequences.push(seq);
                }
            }
        }
        sequences.sort_unstable();
        Ok(sequences)
    }
}
