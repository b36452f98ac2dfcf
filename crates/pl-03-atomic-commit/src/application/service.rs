//! # Commit Manager Service
//!
//! Makes a batch's effects durable, all or nothing.
//!
//! ## Commit protocol
//!
//! 1. Check every pre-image against the committed balances
//! 2. `LOGGING`: append one record per mutation (flag unset) and fsync
//! 3. Honour the abort signal one last time
//! 4. `APPLYING`: write each post-image, then set its record's flag
//! 5. Persist the new root, snapshot a checkpoint, compact the log
//! 6. `COMMITTED`
//!
//! A failure while logging leaves durable state untouched. A failure while
//! applying leaves the batch for `recover_from_crash` to roll back.

use crate::adapters::{
    CheckpointStore, DataDirLock, FileAccountStore, FileAuditLog, SystemTimeSource, WriteAheadLog,
};
use crate::algorithms::{compute_state_root, EMPTY_ROOT};
use crate::config::CommitConfig;
use crate::domain::entities::{
    Checkpoint, CommitBatch, CommitReceipt, CommitRecord, CommitState, PersistedRoot, TxEffects,
};
use crate::domain::errors::{CommitError, RecoveryError, StoreError};
use crate::domain::recovery::{AuditAction, AuditEntry, RecoveryReport};
use crate::ports::inbound::AtomicCommitApi;
use crate::ports::outbound::{AuditSink, TimeSource};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use shared_types::{AbortSignal, AccountId, AccountMutation, Balance, BalanceSheet, Hash, TxId};
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{debug, error, info, warn};

#[cfg(feature = "fault-injection")]
use crate::fault::CrashPoint;

/// Transaction id used for the records written by `seed_accounts`
pub const SEED_TX: TxId = TxId(0);

/// Records of one batch, as stored in each record's `batch_len`
pub(super) fn record_count(mutations: usize) -> Result<u32, CommitError> {
    u32::try_from(mutations).map_err(|_| CommitError::BatchTooLarge { mutations })
}

/// Everything guarded by the single writer lock
pub(super) struct Inner {
    pub(super) state: CommitState,
    pub(super) balances: BalanceSheet,
    pub(super) root: Hash,
    pub(super) batch_seq: u64,
    /// Unfinished log records or unverified state found on disk
    pub(super) needs_recovery: bool,
    pub(super) pending: usize,
    pub(super) halt_reason: Option<String>,
    #[cfg(feature = "fault-injection")]
    pub(super) crash_at: Option<CrashPoint>,
}

impl Inner {
    fn transition(&mut self, next: CommitState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal commit transition {} -> {}",
            self.state,
            next
        );
        debug!(from = %self.state, to = %next, "[pl-03] Commit state transition");
        self.state = next;
    }

    fn ensure_ready(&self) -> Result<(), CommitError> {
        if let Some(reason) = &self.halt_reason {
            return Err(CommitError::Halted {
                reason: reason.clone(),
            });
        }
        if self.needs_recovery {
            return Err(CommitError::RecoveryRequired {
                pending: self.pending,
            });
        }
        Ok(())
    }
}

/// What `open` found on disk
struct Inspection {
    balances: BalanceSheet,
    root: PersistedRoot,
    needs_recovery: bool,
    pending: usize,
}

/// The Commit Manager.
///
/// Owns the data directory exclusively for its whole lifetime.
pub struct CommitManager<A: AuditSink = FileAuditLog, T: TimeSource = SystemTimeSource> {
    pub(super) config: CommitConfig,
    pub(super) wal: WriteAheadLog,
    pub(super) store: FileAccountStore,
    pub(super) checkpoints: CheckpointStore,
    audit: A,
    clock: T,
    pub(super) inner: Mutex<Inner>,
    _lock: DataDirLock,
}

impl CommitManager {
    /// Open with the JSON-lines audit log under the data directory.
    pub fn open(config: CommitConfig) -> Result<Self, CommitError> {
        let audit = FileAuditLog::new(config.audit_log_path());
        Self::open_with(config, audit, SystemTimeSource)
    }
}

impl<A: AuditSink, T: TimeSource> CommitManager<A, T> {
    /// Lock the data directory and load the committed state.
    ///
    /// Does not repair anything. If the log holds unfinished work or the
    /// state does not match its persisted root, commits are refused until
    /// `recover_from_crash` succeeds.
    pub fn open_with(config: CommitConfig, audit: A, clock: T) -> Result<Self, CommitError> {
        std::fs::create_dir_all(&config.data_dir)
            .map_err(|e| StoreError::io(&config.data_dir, e))?;
        let lock = DataDirLock::acquire(&config.data_dir, config.lock_timeout())?;

        let wal = WriteAheadLog::open(config.wal_dir())?;
        let store = FileAccountStore::open(config.state_dir())?;
        let checkpoints = CheckpointStore::open(config.checkpoint_dir())?;

        let inspection = Self::inspect(&wal, &store)?;
        wal.advance_to(inspection.root.last_seq + 1);
        if inspection.needs_recovery {
            warn!(
                pending = inspection.pending,
                "[pl-03] Data directory needs recovery before the next commit"
            );
        }

        info!(
            data_dir = %config.data_dir.display(),
            batch_seq = inspection.root.batch_seq,
            accounts = inspection.balances.len(),
            root = %hex::encode(inspection.root.root),
            "[pl-03] Commit manager opened"
        );

        Ok(Self {
            config,
            wal,
            store,
            checkpoints,
            audit,
            clock,
            inner: Mutex::new(Inner {
                state: CommitState::Idle,
                balances: inspection.balances,
                root: inspection.root.root,
                batch_seq: inspection.root.batch_seq,
                needs_recovery: inspection.needs_recovery,
                pending: inspection.pending,
                halt_reason: None,
                #[cfg(feature = "fault-injection")]
                crash_at: None,
            }),
            _lock: lock,
        })
    }

    fn inspect(wal: &WriteAheadLog, store: &FileAccountStore) -> Result<Inspection, CommitError> {
        let loaded = store.load_all()?;
        let computed = compute_state_root(&loaded.balances);

        let (persisted, root_corrupt) = match store.read_root() {
            Ok(root) => (root, false),
            Err(StoreError::Corrupt { path, reason }) => {
                warn!("[pl-03] Persisted root unreadable at {}: {}", path.display(), reason);
                (None, true)
            }
            Err(e) => return Err(e.into()),
        };

        let scan = wal.scan()?;
        let root_seq = persisted.map(|r| r.batch_seq).unwrap_or(0);
        let pending = scan
            .records
            .iter()
            .filter(|record| record.batch_seq > root_seq)
            .count()
            + scan.corrupt.len();

        let consistent = !root_corrupt
            && loaded.corrupt.is_empty()
            && match persisted {
                Some(root) => root.root == computed,
                None => loaded.balances.is_empty(),
            };

        let root = match persisted {
            Some(root) => root,
            None => {
                let genesis = PersistedRoot::genesis(EMPTY_ROOT);
                if consistent && pending == 0 {
                    store.write_root(&genesis)?;
                }
                genesis
            }
        };

        Ok(Inspection {
            balances: loaded.balances,
            root,
            needs_recovery: pending > 0 || !consistent,
            pending,
        })
    }

    pub fn config(&self) -> &CommitConfig {
        &self.config
    }

    pub fn audit_sink(&self) -> &A {
        &self.audit
    }

    /// Whether commits are refused until recovery runs
    pub fn needs_recovery(&self) -> bool {
        self.inner.lock().needs_recovery
    }

    /// Last committed batch sequence number
    pub fn batch_seq(&self) -> u64 {
        self.inner.lock().batch_seq
    }

    pub fn balance(&self, account: &AccountId) -> Option<Balance> {
        self.inner.lock().balances.get(account).copied()
    }

    pub(super) fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Append to the audit log; failures only warn.
    pub(super) fn emit(&self, entry: AuditEntry) -> AuditEntry {
        if let Err(e) = self.audit.append(&entry) {
            warn!(action = ?entry.action, "[pl-03] Audit log write failed: {}", e);
        }
        entry
    }

    pub(super) fn audit_entry(&self, action: AuditAction, detail: impl Into<String>) -> AuditEntry {
        AuditEntry::new(self.now_ms(), action, detail)
    }

    /// Delete completed records covered by the persisted root
    pub(super) fn compact_log(&self, batch_seq: u64) -> usize {
        if !self.config.compact_after_commit {
            return 0;
        }
        match self.wal.compact(batch_seq) {
            Ok(removed) => {
                if removed > 0 {
                    debug!(removed, batch_seq, "[pl-03] Log compacted");
                    self.emit(
                        self.audit_entry(AuditAction::LogCompacted, format!("{removed} records"))
                            .with_batch(batch_seq),
                    );
                }
                removed
            }
            Err(e) => {
                warn!("[pl-03] Log compaction failed: {}", e);
                0
            }
        }
    }

    /// Stop the next commit at `point`, as if the process crashed there.
    #[cfg(feature = "fault-injection")]
    pub fn arm_crash(&self, point: CrashPoint) {
        self.inner.lock().crash_at = Some(point);
    }

    #[cfg(feature = "fault-injection")]
    fn crash_if(&self, inner: &mut Inner, point: CrashPoint) -> Result<(), CommitError> {
        if inner.crash_at != Some(point) {
            return Ok(());
        }
        warn!(?point, "[pl-03] Injected crash");
        inner.crash_at = None;
        inner.needs_recovery = true;
        inner.state = CommitState::Aborted;
        Err(CommitError::InjectedCrash(point))
    }

    /// Delete the records of a batch that never reached `APPLYING`.
    fn discard_logged(&self, logged: &[CommitRecord]) {
        for record in logged {
            if let Err(e) = self.wal.remove(record.seq) {
                warn!(seq = record.seq, "[pl-03] Could not discard log record: {}", e);
            }
        }
        self.wal.flush();
    }

    fn abort_batch(&self, inner: &mut Inner, batch_seq: u64, reason: &str) {
        inner.transition(CommitState::Aborted);
        self.emit(self.audit_entry(AuditAction::BatchAborted, reason).with_batch(batch_seq));
    }

    fn run_commit(
        &self,
        inner: &mut Inner,
        batch: CommitBatch,
        abort: &AbortSignal,
        action: AuditAction,
    ) -> Result<CommitReceipt, CommitError> {
        let started = Instant::now();
        inner.ensure_ready()?;
        if !inner.state.is_ready() {
            return Err(CommitError::Halted {
                reason: format!("commit manager busy in {}", inner.state),
            });
        }

        let batch_seq = inner.batch_seq + 1;

        // Pre-images must chain from the committed balances
        let mut post_state = inner.balances.clone();
        for effects in &batch.effects {
            for mutation in &effects.mutations {
                let found = post_state.get(&mutation.account).copied();
                if found != mutation.pre {
                    return Err(CommitError::StalePreImage {
                        tx: effects.tx,
                        account: mutation.account.clone(),
                        expected: mutation.pre,
                        found,
                    });
                }
                post_state.insert(mutation.account.clone(), mutation.post);
            }
        }
        let batch_root = compute_state_root(&post_state);
        let batch_len = record_count(batch.mutation_count())?;

        // LOGGING
        inner.transition(CommitState::Logging);
        let mut logged: Vec<CommitRecord> = Vec::with_capacity(batch.mutation_count());
        for effects in &batch.effects {
            for mutation in &effects.mutations {
                let draft = CommitRecord {
                    seq: 0,
                    batch_seq,
                    batch_len,
                    tx: effects.tx,
                    tx_digest: effects.digest,
                    mutation: mutation.clone(),
                    batch_root,
                    completed: false,
                };
                match self.wal.append(draft) {
                    Ok(record) => logged.push(record),
                    Err(e) => {
                        error!(batch_seq, "[pl-03] Logging failed: {}", e);
                        self.discard_logged(&logged);
                        self.abort_batch(inner, batch_seq, &format!("logging failed: {e}"));
                        return Err(CommitError::Logging(e));
                    }
                }
            }
        }
        self.wal.flush();
        debug!(batch_seq, records = logged.len(), "[pl-03] Batch logged");

        #[cfg(feature = "fault-injection")]
        self.crash_if(inner, CrashPoint::AfterLogging)?;

        if abort.is_aborted() {
            info!(batch_seq, "[pl-03] Batch aborted before apply");
            self.discard_logged(&logged);
            self.abort_batch(inner, batch_seq, "aborted before apply");
            return Err(CommitError::Aborted { batch_seq });
        }

        // APPLYING
        inner.transition(CommitState::Applying);
        for (index, record) in logged.iter().enumerate() {
            #[cfg(feature = "fault-injection")]
            self.crash_if(inner, CrashPoint::MidApply { applied: index })?;

            let applied = self
                .store
                .write(record.account(), record.mutation.post)
                .and_then(|_| self.wal.mark_completed(record));
            if let Err(e) = applied {
                error!(batch_seq, index, "[pl-03] Apply failed: {}", e);
                inner.needs_recovery = true;
                inner.pending = logged.len();
                self.abort_batch(inner, batch_seq, &format!("apply failed: {e}"));
                return Err(CommitError::Apply(e));
            }
        }

        #[cfg(feature = "fault-injection")]
        self.crash_if(inner, CrashPoint::BeforeRootPersist)?;

        let persisted = PersistedRoot {
            root: batch_root,
            batch_seq,
            last_seq: self.wal.last_seq(),
        };
        if let Err(e) = self.store.write_root(&persisted) {
            error!(batch_seq, "[pl-03] Root persist failed: {}", e);
            inner.needs_recovery = true;
            inner.pending = logged.len();
            self.abort_batch(inner, batch_seq, &format!("root persist failed: {e}"));
            return Err(CommitError::RootPersist(e));
        }

        let previous_root = inner.root;
        let accounts_touched = logged
            .iter()
            .map(|record| record.account())
            .collect::<BTreeSet<_>>()
            .len();
        inner.balances = post_state;
        inner.root = batch_root;
        inner.batch_seq = batch_seq;
        inner.transition(CommitState::Committed);

        if self.config.checkpoint_after_commit {
            let checkpoint = Checkpoint {
                batch_seq,
                root: batch_root,
                balances: inner.balances.clone(),
            };
            if let Err(e) = self.checkpoints.write(&checkpoint) {
                warn!(batch_seq, "[pl-03] Checkpoint write failed: {}", e);
            }
        }
        self.compact_log(batch_seq);

        let receipt = CommitReceipt {
            batch_seq,
            previous_root,
            root: batch_root,
            records_written: logged.len(),
            accounts_touched,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        self.emit(
            self.audit_entry(
                action,
                format!(
                    "{} records, {} accounts, root {}",
                    receipt.records_written,
                    receipt.accounts_touched,
                    receipt.root_hex()
                ),
            )
            .with_batch(batch_seq),
        );
        info!(
            batch_seq,
            records = receipt.records_written,
            accounts = receipt.accounts_touched,
            root = %receipt.root_hex(),
            "[pl-03] Batch committed"
        );

        Ok(receipt)
    }

    /// Make `batch` durable.
    pub fn commit(&self, batch: CommitBatch, abort: &AbortSignal) -> Result<CommitReceipt, CommitError> {
        let mut inner = self.inner.lock();
        self.run_commit(&mut inner, batch, abort, AuditAction::BatchCommitted)
    }

    /// Open new accounts with initial balances, as one committed batch.
    pub fn seed_accounts(
        &self,
        balances: Vec<(AccountId, Balance)>,
    ) -> Result<CommitReceipt, CommitError> {
        let mut inner = self.inner.lock();

        let mut seen = BTreeSet::new();
        for (account, _) in &balances {
            if inner.balances.contains_key(account) || !seen.insert(account.clone()) {
                return Err(CommitError::AccountExists(account.clone()));
            }
        }

        let encoded = bincode::serialize(&balances).unwrap_or_default();
        let digest: Hash = Sha256::digest(&encoded).into();
        let mutations = balances
            .into_iter()
            .map(|(account, balance)| AccountMutation::new(account, None, balance))
            .collect();
        let batch = CommitBatch::new(vec![TxEffects::new(SEED_TX, digest, mutations)]);

        self.run_commit(&mut inner, batch, &AbortSignal::new(), AuditAction::AccountsSeeded)
    }

    /// Leave the halted state once durable state verifies again.
    pub fn resume_after_manual_repair(&self) -> Result<Hash, RecoveryError> {
        let mut inner = self.inner.lock();

        let persisted = self.store.read_root()?;
        let root_seq = persisted.map(|r| r.batch_seq).unwrap_or(0);
        let scan = self.wal.scan()?;
        let pending = scan
            .records
            .iter()
            .filter(|record| record.batch_seq > root_seq)
            .count()
            + scan.corrupt.len();
        if pending > 0 {
            return Err(RecoveryError::PendingRecords { count: pending });
        }

        let loaded = self.store.load_all()?;
        let actual = compute_state_root(&loaded.balances);
        let expected = persisted.map(|r| r.root).unwrap_or(EMPTY_ROOT);
        if !loaded.corrupt.is_empty() || actual != expected {
            warn!("[pl-03] Manual repair rejected: state still does not match its root");
            return Err(RecoveryError::MerkleMismatch { expected, actual });
        }

        inner.balances = loaded.balances;
        inner.root = actual;
        inner.batch_seq = root_seq;
        inner.needs_recovery = false;
        inner.pending = 0;
        inner.halt_reason = None;
        inner.state = CommitState::Idle;

        self.emit(
            self.audit_entry(AuditAction::ManualRepairAccepted, hex::encode(actual))
                .with_batch(root_seq),
        );
        info!(root = %hex::encode(actual), "[pl-03] Resumed after manual repair");
        Ok(actual)
    }

    pub fn state(&self) -> CommitState {
        self.inner.lock().state
    }

    pub fn state_root(&self) -> Hash {
        self.inner.lock().root
    }

    pub fn balances(&self) -> BalanceSheet {
        self.inner.lock().balances.clone()
    }
}

impl<A: AuditSink, T: TimeSource> AtomicCommitApi for CommitManager<A, T> {
    fn commit(&self, batch: CommitBatch, abort: &AbortSignal) -> Result<CommitReceipt, CommitError> {
        CommitManager::commit(self, batch, abort)
    }

    fn seed_accounts(
        &self,
        balances: Vec<(AccountId, Balance)>,
    ) -> Result<CommitReceipt, CommitError> {
        CommitManager::seed_accounts(self, balances)
    }

    fn recover_from_crash(&self) -> Result<RecoveryReport, RecoveryError> {
        CommitManager::recover_from_crash(self)
    }

    fn resume_after_manual_repair(&self) -> Result<Hash, RecoveryError> {
        CommitManager::resume_after_manual_repair(self)
    }

    fn state_root(&self) -> Hash {
        CommitManager::state_root(self)
    }

    fn balances(&self) -> BalanceSheet {
        CommitManager::balances(self)
    }

    fn state(&self) -> CommitState {
        CommitManager::state(self)
    }
}
