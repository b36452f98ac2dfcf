//! # Crash Safety and Recovery
//!
//! Commits stopped at each crash point, then recovered after a restart.

#[cfg(test)]
mod tests {
    use crate::fixtures::{account, engine_config, seeded_engine};
    use pl_03_atomic_commit::{
        AuditAction, CommitError, CommitManager, CommitState, CrashPoint, RecoveryError,
        RecoveryReport,
    };
    use pl_runtime::{BatchEngine, EngineConfig, EngineError};
    use shared_types::{Hash, Transaction};
    use tempfile::TempDir;

    const ACCOUNTS: &[(&str, u128)] = &[("a", 100), ("b", 50), ("c", 0)];

    fn batch() -> Vec<Transaction> {
        vec![
            Transaction::transfer(1, "a", "b", 30),
            Transaction::transfer(2, "b", "c", 20),
        ]
    }

    fn manual_config(dir: &TempDir) -> EngineConfig {
        let mut config = engine_config(dir);
        config.recover_on_open = false;
        config
    }

    /// Seed, arm `point`, submit and "crash". Returns the pre-batch root.
    fn crash_at(dir: &TempDir, point: CrashPoint) -> Hash {
        let engine = seeded_engine(dir, ACCOUNTS);
        let root = engine.state_root();

        engine.commit_manager().arm_crash(point);
        let err = engine.submit(batch()).unwrap_err();
        assert!(matches!(err, EngineError::Commit(CommitError::InjectedCrash(p)) if p == point));
        assert!(err.requires_recovery());
        assert!(engine.needs_recovery());
        root
    }

    /// Counters that must not change between two recovery runs
    fn summary(report: &RecoveryReport) -> (bool, usize, usize, usize, usize, bool, bool) {
        (
            report.recovered,
            report.rolled_back_count,
            report.replayed_batches,
            report.corrupt_records,
            report.temp_files_cleaned,
            report.merkle_verified,
            report.checkpoint_restored,
        )
    }

    // =========================================================================
    // CRASH POINTS
    // =========================================================================

    #[test]
    fn test_crash_after_logging_rolls_back() {
        let dir = TempDir::new().unwrap();
        let before = crash_at(&dir, CrashPoint::AfterLogging);

        let engine = BatchEngine::open(manual_config(&dir)).unwrap();
        assert!(engine.needs_recovery());
        let refused = engine.submit(batch()).unwrap_err();
        assert!(matches!(
            refused,
            EngineError::Commit(CommitError::RecoveryRequired { .. })
        ));

        let report = engine.recover_from_crash().unwrap();
        assert!(report.recovered);
        assert!(report.merkle_verified);
        assert_eq!(report.uncommitted_count, 4);
        assert_eq!(report.rolled_back_count, 4);
        assert_eq!(engine.state_root(), before);
        assert_eq!(engine.balance(&account("a")), Some(100));
        assert_eq!(engine.balance(&account("c")), Some(0));
    }

    #[test]
    fn test_crash_mid_apply_rolls_back() {
        let dir = TempDir::new().unwrap();
        let before = crash_at(&dir, CrashPoint::MidApply { applied: 2 });

        let engine = BatchEngine::open(manual_config(&dir)).unwrap();
        let report = engine.recover_from_crash().unwrap();

        assert_eq!(report.rolled_back_count, 4);
        assert_eq!(report.uncommitted_count, 2);
        assert_eq!(engine.state_root(), before);
        assert_eq!(engine.balance(&account("b")), Some(50));
        assert_eq!(report.actions(AuditAction::BatchRolledBack).count(), 1);
    }

    #[test]
    fn test_crash_before_root_persist_replays() {
        let dir = TempDir::new().unwrap();
        let before = crash_at(&dir, CrashPoint::BeforeRootPersist);

        let engine = BatchEngine::open(manual_config(&dir)).unwrap();
        let report = engine.recover_from_crash().unwrap();

        assert_eq!(report.replayed_batches, 1);
        assert_eq!(report.rolled_back_count, 0);
        assert_ne!(engine.state_root(), before);
        assert_eq!(engine.balance(&account("a")), Some(70));
        assert_eq!(engine.balance(&account("b")), Some(60));
        assert_eq!(engine.balance(&account("c")), Some(20));
    }

    #[test]
    fn test_crash_before_root_persist_rolls_back_without_replay() {
        let dir = TempDir::new().unwrap();
        let before = crash_at(&dir, CrashPoint::BeforeRootPersist);

        let mut config = manual_config(&dir);
        config.commit.replay_completed = false;
        let engine = BatchEngine::open(config).unwrap();
        let report = engine.recover_from_crash().unwrap();

        assert_eq!(report.replayed_batches, 0);
        assert_eq!(report.rolled_back_count, 4);
        assert_eq!(engine.state_root(), before);
    }

    #[test]
    fn test_recover_on_open() {
        let dir = TempDir::new().unwrap();
        let before = crash_at(&dir, CrashPoint::AfterLogging);

        let engine = BatchEngine::open(engine_config(&dir)).unwrap();
        assert!(!engine.needs_recovery());
        assert_eq!(engine.state_root(), before);

        let report = engine.submit(batch()).unwrap();
        assert_eq!(report.receipt.previous_root, before);
        assert_eq!(engine.commit_state(), CommitState::Committed);
    }

    #[test]
    fn test_recovery_in_process_without_restart() {
        let dir = TempDir::new().unwrap();
        let engine = seeded_engine(&dir, ACCOUNTS);
        let before = engine.state_root();

        engine.commit_manager().arm_crash(CrashPoint::MidApply { applied: 1 });
        assert!(engine.submit(batch()).is_err());

        let report = engine.recover_from_crash().unwrap();
        assert_eq!(report.rolled_back_count, 4);
        assert_eq!(engine.state_root(), before);
        engine.submit(batch()).unwrap();
    }

    // =========================================================================
    // IDEMPOTENCE
    // =========================================================================

    #[test]
    fn test_recovery_idempotent() {
        let dir = TempDir::new().unwrap();
        let before = crash_at(&dir, CrashPoint::MidApply { applied: 3 });

        let engine = BatchEngine::open(manual_config(&dir)).unwrap();
        let first = engine.recover_from_crash().unwrap();
        let second = engine.recover_from_crash().unwrap();
        let third = engine.recover_from_crash().unwrap();

        assert_eq!(first.rolled_back_count, 4);
        assert_eq!(second.rolled_back_count, 0);
        assert_eq!(second.uncommitted_count, 0);
        assert!(second.is_clean());
        assert_eq!(summary(&second), summary(&third));
        assert_eq!(engine.state_root(), before);
    }

    #[test]
    fn test_recovery_interrupted_mid_rollback_resumes() {
        let dir = TempDir::new().unwrap();
        let before = crash_at(&dir, CrashPoint::MidApply { applied: 3 });

        {
            let manager = CommitManager::open(manual_config(&dir).commit).unwrap();
            manager.arm_crash(CrashPoint::MidRollback { rolled_back: 2 });
            let err = manager.recover_from_crash().unwrap_err();
            assert!(matches!(
                err,
                RecoveryError::InjectedCrash(CrashPoint::MidRollback { rolled_back: 2 })
            ));
            assert_eq!(manager.state(), CommitState::Halted);
        }

        let engine = BatchEngine::open(manual_config(&dir)).unwrap();
        assert!(engine.needs_recovery());
        let report = engine.recover_from_crash().unwrap();

        assert_eq!(report.rolled_back_count, 2);
        assert!(!report.checkpoint_restored);
        assert!(report.merkle_verified);
        assert_eq!(engine.state_root(), before);
        assert_eq!(engine.balance(&account("a")), Some(100));
        assert_eq!(engine.balance(&account("b")), Some(50));
        assert_eq!(engine.balance(&account("c")), Some(0));
        assert!(engine.recover_from_crash().unwrap().is_clean());
    }

    #[test]
    fn test_recovery_idempotent_across_restarts() {
        let dir = TempDir::new().unwrap();
        crash_at(&dir, CrashPoint::AfterLogging);

        let first = {
            let manager = CommitManager::open(engine_config(&dir).commit).unwrap();
            manager.recover_from_crash().unwrap();
            manager.state_root()
        };

        let manager = CommitManager::open(engine_config(&dir).commit).unwrap();
        assert!(!manager.needs_recovery());
        let report = manager.recover_from_crash().unwrap();
        assert!(report.is_clean());
        assert_eq!(manager.state_root(), first);
    }
}
