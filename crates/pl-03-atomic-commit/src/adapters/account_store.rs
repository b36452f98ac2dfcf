//! File-backed account state.
//!
//! One file per account under `state/accounts/`, named by the hex of the
//! account id, plus the persisted root in `state/ROOT`. Every file carries a
//! CRC32 trailer and is replaced atomically.

use super::infra::{
    read_optional, remove_if_exists, remove_temp_files, seal, sync_dir, unseal, write_atomic,
    DefaultChecksumProvider,
};
use crate::domain::entities::PersistedRoot;
use crate::domain::errors::StoreError;
use shared_types::{AccountId, Balance, BalanceSheet};
use std::fs;
use std::path::{Path, PathBuf};

const ACCOUNT_EXTENSION: &str = "acct";
const ROOT_FILE: &str = "ROOT";

/// Everything found in the accounts directory.
#[derive(Debug, Default)]
pub struct LoadedState {
    pub balances: BalanceSheet,
    /// Account files that failed their checksum
    pub corrupt: Vec<PathBuf>,
}

/// Durable account balances and the persisted state root.
pub struct FileAccountStore {
    state_dir: PathBuf,
    accounts_dir: PathBuf,
    checksum: DefaultChecksumProvider,
}

impl FileAccountStore {
    pub fn open(state_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let state_dir = state_dir.into();
        let accounts_dir = state_dir.join("accounts");
        fs::create_dir_all(&accounts_dir).map_err(|e| StoreError::io(&accounts_dir, e))?;

        Ok(Self {
            state_dir,
            accounts_dir,
            checksum: DefaultChecksumProvider,
        })
    }

    fn account_path(&self, account: &AccountId) -> PathBuf {
        self.accounts_dir.join(format!(
            "{}.{ACCOUNT_EXTENSION}",
            hex::encode(account.as_str().as_bytes())
        ))
    }

    fn root_path(&self) -> PathBuf {
        self.state_dir.join(ROOT_FILE)
    }

    fn decode_account(&self, path: &Path, bytes: &[u8]) -> Result<(AccountId, Balance), StoreError> {
        let payload = unseal(&self.checksum, path, bytes)?;
        bincode::deserialize(payload)
            .map_err(|e| StoreError::corrupt(path, format!("undecodable account: {e}")))
    }

    pub fn read(&self, account: &AccountId) -> Result<Option<Balance>, StoreError> {
        let path = self.account_path(account);
        match read_optional(&path)? {
            Some(bytes) => Ok(Some(self.decode_account(&path, &bytes)?.1)),
            None => Ok(None),
        }
    }

    pub fn write(&self, account: &AccountId, balance: Balance) -> Result<(), StoreError> {
        let payload = bincode::serialize(&(account, balance))
            .map_err(|e| StoreError::Encoding(e.to_string()))?;
        write_atomic(&self.account_path(account), &seal(&self.checksum, payload))
    }

    /// Close an account; `Ok(false)` if it was not open.
    pub fn remove(&self, account: &AccountId) -> Result<bool, StoreError> {
        let removed = remove_if_exists(&self.account_path(account))?;
        if removed {
            sync_dir(Some(&self.accounts_dir));
        }
        Ok(removed)
    }

    /// Load every account file.
    ///
    /// A file whose name does not match the account it decodes to counts as
    /// corrupt, as does one failing its checksum.
    pub fn load_all(&self) -> Result<LoadedState, StoreError> {
        let mut loaded = LoadedState::default();
        let entries =
            fs::read_dir(&self.accounts_dir).map_err(|e| StoreError::io(&self.accounts_dir, e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StoreError::io(&self.accounts_dir, e))?.path();
            if path.extension().is_some_and(|ext| ext == ACCOUNT_EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            let bytes = fs::read(&path).map_err(|e| StoreError::io(&path, e))?;
            match self.decode_account(&path, &bytes) {
                Ok((account, balance)) if self.account_path(&account) == path => {
                    loaded.balances.insert(account, balance);
                }
                _ => loaded.corrupt.push(path),
            }
        }

        Ok(loaded)
    }

    /// Make the accounts directory hold exactly `balances`.
    pub fn replace_all(&self, balances: &BalanceSheet) -> Result<(), StoreError> {
        let entries =
            fs::read_dir(&self.accounts_dir).map_err(|e| StoreError::io(&self.accounts_dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| StoreError::io(&self.accounts_dir, e))?.path();
            let keep = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| hex::decode(stem).ok())
                .and_then(|raw| String::from_utf8(raw).ok())
                .is_some_and(|id| balances.contains_key(&AccountId::new(id)))
                && path.extension().is_some_and(|ext| ext == ACCOUNT_EXTENSION);
            if !keep {
                remove_if_exists(&path)?;
            }
        }

        for (account, balance) in balances {
            self.write(account, *balance)?;
        }
        sync_dir(Some(&self.accounts_dir));
        Ok(())
    }

    /// Persisted root; `Ok(None)` before the first commit.
    pub fn read_root(&self) -> Result<Option<PersistedRoot>, StoreError> {
        let path = self.root_path();
        let Some(bytes) = read_optional(&path)? else {
            return Ok(None);
        };
        let payload = unseal(&self.checksum, &path, &bytes)?;
        bincode::deserialize(payload)
            .map(Some)
            .map_err(|e| StoreError::corrupt(&path, format!("undecodable root: {e}")))
    }

    pub fn write_root(&self, root: &PersistedRoot) -> Result<(), StoreError> {
        let payload = bincode::serialize(root).map_err(|e| StoreError::Encoding(e.to_string()))?;
        write_atomic(&self.root_path(), &seal(&self.checksum, payload))
    }

    /// Delete orphaned temporary files left by interrupted writes.
    pub fn clean_temp_files(&self) -> Result<Vec<PathBuf>, StoreError> {
        let mut removed = remove_temp_files(&self.accounts_dir)?;
        removed.extend(remove_temp_files(&self.state_dir)?);
        Ok(removed)
    }
}
