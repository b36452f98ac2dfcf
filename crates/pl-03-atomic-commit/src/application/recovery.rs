//! Crash recovery for the Commit Manager.

use super::service::{CommitManager, Inner};
use crate::algorithms::{compute_state_root, EMPTY_ROOT};
use crate::domain::entities::{CommitRecord, CommitState, PersistedRoot};
use crate::domain::errors::{RecoveryError, StoreError};
use crate::domain::recovery::{AuditAction, AuditEntry, RecoveryIssue, RecoveryReport};
use crate::ports::outbound::{AuditSink, TimeSource};
use shared_types::BalanceSheet;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{error, info, warn};

#[cfg(feature = "fault-injection")]
use crate::fault::CrashPoint;

/// State that matched its persisted root at the end of recovery
struct VerifiedState {
    balances: BalanceSheet,
    root: PersistedRoot,
}

/// Every record of the batch is present and flagged
fn is_complete(records: &[CommitRecord]) -> bool {
    records
        .first()
        .is_some_and(|first| records.len() == first.batch_len as usize)
        && records.iter().all(|record| record.completed)
}

/// Stop recovery after `rolled_back` rollbacks if that crash is armed
#[cfg(feature = "fault-injection")]
fn crash_if_rolled_back(inner: &mut Inner, rolled_back: usize) -> Result<(), RecoveryError> {
    let point = CrashPoint::MidRollback { rolled_back };
    if inner.crash_at != Some(point) {
        return Ok(());
    }
    warn!(rolled_back, "[pl-03] Injected crash during recovery");
    inner.crash_at = None;
    Err(RecoveryError::InjectedCrash(point))
}

impl<A: AuditSink, T: TimeSource> CommitManager<A, T> {
    fn note(&self, report: &mut RecoveryReport, entry: AuditEntry) {
        let entry = self.emit(entry);
        report.audit.push(entry);
    }

    /// Bring durable state back to its last committed batch.
    ///
    /// Safe to run repeatedly; a second run on a recovered directory rolls
    /// nothing back. A state that cannot be verified, even from the
    /// checkpoint, halts the manager.
    pub fn recover_from_crash(&self) -> Result<RecoveryReport, RecoveryError> {
        let started = Instant::now();
        let mut inner = self.inner.lock();
        let mut report = RecoveryReport::new();

        info!(state = %inner.state, "[pl-03] Crash recovery started");
        self.note(
            &mut report,
            self.audit_entry(
                AuditAction::RecoveryStarted,
                format!("state {}, last batch {}", inner.state, inner.batch_seq),
            ),
        );

        match self.run_recovery(&mut inner, &mut report) {
            Ok(verified) => {
                inner.balances = verified.balances;
                inner.root = verified.root.root;
                inner.batch_seq = verified.root.batch_seq;
                inner.needs_recovery = false;
                inner.pending = 0;
                inner.halt_reason = None;
                inner.state = CommitState::Idle;

                report.recovered = true;
                report.duration_ms = started.elapsed().as_millis() as u64;
                let finished = self
                    .audit_entry(
                        AuditAction::RecoveryFinished,
                        format!(
                            "rolled back {}, replayed {}, temp files {}, root {}",
                            report.rolled_back_count,
                            report.replayed_batches,
                            report.temp_files_cleaned,
                            hex::encode(verified.root.root)
                        ),
                    )
                    .with_batch(verified.root.batch_seq);
                self.note(&mut report, finished);
                info!(
                    rolled_back = report.rolled_back_count,
                    replayed = report.replayed_batches,
                    temp_files = report.temp_files_cleaned,
                    checkpoint_restored = report.checkpoint_restored,
                    duration_ms = report.duration_ms,
                    "[pl-03] Crash recovery finished"
                );
                Ok(report)
            }
            Err(err) => {
                error!("[pl-03] Crash recovery failed, halting: {}", err);
                self.note(
                    &mut report,
                    self.audit_entry(AuditAction::RecoveryFailed, err.to_string()),
                );
                inner.needs_recovery = true;
                inner.halt_reason = Some(err.to_string());
                inner.state = CommitState::Halted;
                Err(err)
            }
        }
    }

    #[cfg_attr(not(feature = "fault-injection"), allow(unused_variables))]
    fn run_recovery(
        &self,
        inner: &mut Inner,
        report: &mut RecoveryReport,
    ) -> Result<VerifiedState, RecoveryError> {
        // (1) records that fail their content hash carry nothing usable
        let scan = self.wal.scan()?;
        for path in &scan.corrupt {
            self.wal.discard(path)?;
            report.corrupt_records += 1;
            report.add_error(RecoveryIssue::new(
                Some(path.clone()),
                "log record failed its content hash",
            ));
            self.note(
                report,
                self.audit_entry(AuditAction::CorruptRecordDiscarded, path.display().to_string()),
            );
        }

        let mut persisted = match self.store.read_root() {
            Ok(root) => root,
            Err(err @ StoreError::Corrupt { .. }) => {
                report.add_error(RecoveryIssue::new(None, err.to_string()));
                None
            }
            Err(err) => return Err(err.into()),
        };
        let root_seq = persisted.map(|r| r.batch_seq).unwrap_or(0);

        let mut batches: BTreeMap<u64, Vec<CommitRecord>> = BTreeMap::new();
        for record in scan.records {
            if record.batch_seq > root_seq {
                batches.entry(record.batch_seq).or_default().push(record);
            }
        }
        report.uncommitted_count = batches
            .values()
            .flatten()
            .filter(|record| !record.completed)
            .count();

        // Once one batch is unfinished, nothing after it can be replayed
        let mut replayable = Vec::new();
        let mut unfinished = Vec::new();
        for (batch_seq, records) in batches {
            if unfinished.is_empty() && self.config.replay_completed && is_complete(&records) {
                replayable.push((batch_seq, records));
            } else {
                unfinished.push((batch_seq, records));
            }
        }

        // (2) roll back, newest batch first, newest record first; each record
        // is removed as soon as its pre-image is back
        for (batch_seq, records) in unfinished.iter().rev() {
            for record in records.iter().rev() {
                #[cfg(feature = "fault-injection")]
                crash_if_rolled_back(inner, report.rolled_back_count)?;

                match record.mutation.pre {
                    Some(balance) => self.store.write(record.account(), balance)?,
                    None => {
                        self.store.remove(record.account())?;
                    }
                }
                self.wal.remove(record.seq)?;
                self.wal.flush();
                report.rolled_back_count += 1;
                self.note(
                    report,
                    self.audit_entry(
                        AuditAction::MutationRolledBack,
                        format!(
                            "seq {} {} {} -> {:?}",
                            record.seq,
                            record.tx,
                            record.account(),
                            record.mutation.pre
                        ),
                    )
                    .with_batch(*batch_seq),
                );
            }
            warn!(
                batch_seq,
                records = records.len(),
                "[pl-03] Rolled back unfinished batch"
            );
            self.note(
                report,
                self.audit_entry(
                    AuditAction::BatchRolledBack,
                    format!("{} records", records.len()),
                )
                .with_batch(*batch_seq),
            );
        }

        // (3) orphaned temporary files
        let mut temp_files = self.store.clean_temp_files()?;
        temp_files.extend(self.wal.clean_temp_files()?);
        temp_files.extend(self.checkpoints.clean_temp_files()?);
        for path in &temp_files {
            self.note(
                report,
                self.audit_entry(AuditAction::TempFileRemoved, path.display().to_string()),
            );
        }
        report.temp_files_cleaned = temp_files.len();

        // (4) completed batches whose root never made it to disk
        let mut replay_failure = None;
        for (batch_seq, records) in &replayable {
            for record in records {
                self.store.write(record.account(), record.mutation.post)?;
            }

            let expected = records
                .first()
                .map(|record| record.batch_root)
                .unwrap_or(EMPTY_ROOT);
            let actual = compute_state_root(&self.store.load_all()?.balances);
            if actual != expected {
                warn!(batch_seq, "[pl-03] Replay did not reproduce the logged root");
                report.add_error(RecoveryIssue::new(
                    None,
                    format!("replay of batch {batch_seq} did not reproduce its root"),
                ));
                self.note(
                    report,
                    self.audit_entry(AuditAction::RootMismatch, hex::encode(actual))
                        .with_batch(*batch_seq),
                );
                replay_failure = Some(RecoveryError::ReplayMismatch {
                    batch_seq: *batch_seq,
                    expected,
                    actual,
                });
                break;
            }

            let root = PersistedRoot {
                root: expected,
                batch_seq: *batch_seq,
                last_seq: records.last().map(|record| record.seq).unwrap_or(0),
            };
            self.store.write_root(&root)?;
            persisted = Some(root);
            report.replayed_batches += 1;
            self.note(
                report,
                self.audit_entry(
                    AuditAction::BatchReplayed,
                    format!("{} records", records.len()),
                )
                .with_batch(*batch_seq),
            );
        }

        // (5) verify against the persisted root
        let expected = persisted.map(|r| r.root).unwrap_or(EMPTY_ROOT);
        let loaded = self.store.load_all()?;
        for path in &loaded.corrupt {
            report.add_error(RecoveryIssue::new(
                Some(path.clone()),
                "account file failed its checksum",
            ));
        }
        let actual = compute_state_root(&loaded.balances);

        if loaded.corrupt.is_empty() && actual == expected && replay_failure.is_none() {
            let root = match persisted {
                Some(root) => root,
                None => {
                    let genesis = PersistedRoot::genesis(EMPTY_ROOT);
                    self.store.write_root(&genesis)?;
                    genesis
                }
            };
            report.merkle_verified = true;
            self.note(
                report,
                self.audit_entry(AuditAction::RootVerified, hex::encode(root.root))
                    .with_batch(root.batch_seq),
            );
            self.compact_log(root.batch_seq);
            return Ok(VerifiedState {
                balances: loaded.balances,
                root,
            });
        }

        warn!(
            expected = %hex::encode(expected),
            actual = %hex::encode(actual),
            "[pl-03] State root mismatch, restoring checkpoint"
        );
        self.note(
            report,
            self.audit_entry(
                AuditAction::RootMismatch,
                format!("persisted {}, computed {}", hex::encode(expected), hex::encode(actual)),
            ),
        );

        match self.restore_checkpoint(report)? {
            Some(verified) => Ok(verified),
            None => Err(replay_failure.unwrap_or(RecoveryError::MerkleMismatch { expected, actual })),
        }
    }

    /// Replace durable state with the last checkpoint, if it verifies.
    fn restore_checkpoint(
        &self,
        report: &mut RecoveryReport,
    ) -> Result<Option<VerifiedState>, RecoveryError> {
        let checkpoint = match self.checkpoints.read() {
            Ok(Some(checkpoint)) => checkpoint,
            Ok(None) => {
                report.add_error(RecoveryIssue::new(None, "no checkpoint available"));
                return Ok(None);
            }
            Err(err) => {
                report.add_error(RecoveryIssue::new(None, err.to_string()));
                return Ok(None);
            }
        };

        if compute_state_root(&checkpoint.balances) != checkpoint.root {
            report.add_error(RecoveryIssue::new(
                None,
                "checkpoint does not match its own root",
            ));
            return Ok(None);
        }

        self.store.replace_all(&checkpoint.balances)?;
        let root = PersistedRoot {
            root: checkpoint.root,
            batch_seq: checkpoint.batch_seq,
            last_seq: self.wal.last_seq(),
        };
        self.store.write_root(&root)?;
        let dropped = self.wal.truncate_after(checkpoint.batch_seq)?;

        report.checkpoint_restored = true;
        self.note(
            report,
            self.audit_entry(
                AuditAction::CheckpointRestored,
                format!("{} accounts, {} log records dropped", checkpoint.balances.len(), dropped),
            )
            .with_batch(checkpoint.batch_seq),
        );

        let loaded = self.store.load_all()?;
        if !loaded.corrupt.is_empty() || compute_state_root(&loaded.balances) != root.root {
            return Ok(None);
        }

        report.merkle_verified = true;
        self.note(
            report,
            self.audit_entry(AuditAction::RootVerified, hex::encode(root.root))
                .with_batch(root.batch_seq),
        );
        self.compact_log(root.batch_seq);
        Ok(Some(VerifiedState {
            balances: loaded.balances,
            root,
        }))
    }
}
