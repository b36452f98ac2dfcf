//! Last known-good snapshot, written after each commit.

use super::infra::{read_optional, remove_temp_files, seal, unseal, write_atomic, DefaultChecksumProvider};
use crate::domain::entities::Checkpoint;
use crate::domain::errors::StoreError;
use std::fs;
use std::path::PathBuf;

const SNAPSHOT_FILE: &str = "snapshot.bin";

pub struct CheckpointStore {
    dir: PathBuf,
    checksum: DefaultChecksumProvider,
}

impl CheckpointStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        Ok(Self {
            dir,
            checksum: DefaultChecksumProvider,
        })
    }

    fn path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    pub fn write(&self, checkpoint: &Checkpoint) -> Result<(), StoreError> {
        let payload =
            bincode::serialize(checkpoint).map_err(|e| StoreError::Encoding(e.to_string()))?;
        write_atomic(&self.path(), &seal(&self.checksum, payload))
    }

    /// Latest snapshot; `Ok(None)` if none was ever written.
    pub fn read(&self) -> Result<Option<Checkpoint>, StoreError> {
        let path = self.path();
        let Some(bytes) = read_optional(&path)? else {
            return Ok(None);
        };
        let payload = unseal(&self.checksum, &path, &bytes)?;
        bincode::deserialize(payload)
            .map(Some)
            .map_err(|e| StoreError::corrupt(&path, format!("undecodable checkpoint: {e}")))
    }

    pub fn clean_temp_files(&self) -> Result<Vec<PathBuf>, StoreError> {
        remove_temp_files(&self.dir)
    }
}
