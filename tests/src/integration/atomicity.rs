//! # Batch Atomicity
//!
//! A batch with any failing transaction leaves no trace in durable state,
//! including across a restart.

#[cfg(test)]
mod tests {
    use crate::fixtures::{account, engine_config, CappedConservation, RejectingVerifier};
    use pl_01_dependency_analysis::AnalysisError;
    use pl_02_parallel_execution::{
        AcceptAllVerifier, ConservationChecker, ExecutionError, NoQuarantine, TxFailure, Verifier,
        ZeroSumConservation,
    };
    use pl_runtime::{BatchEngine, EngineError};
    use shared_types::{BalanceSheet, Hash, Transaction, TxId};
    use tempfile::TempDir;

    const ACCOUNTS: &[(&str, u128)] = &[("a", 100), ("b", 100), ("c", 100), ("d", 0)];

    fn open<V: Verifier, C: ConservationChecker>(
        dir: &TempDir,
        verifier: V,
        conservation: C,
    ) -> BatchEngine<V, C, NoQuarantine> {
        let engine =
            BatchEngine::open_with(engine_config(dir), verifier, conservation, NoQuarantine).unwrap();
        engine
            .seed_accounts(ACCOUNTS.iter().map(|(n, b)| (account(n), *b)).collect())
            .unwrap();
        engine
    }

    fn batch() -> Vec<Transaction> {
        vec![
            Transaction::transfer(1, "a", "d", 10),
            Transaction::transfer(2, "b", "d", 30),
            Transaction::transfer(3, "c", "a", 5),
        ]
    }

    fn log_records(dir: &TempDir) -> usize {
        let wal = engine_config(dir).commit.wal_dir();
        std::fs::read_dir(wal)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .filter(|e| e.path().extension().is_some_and(|ext| ext == "rec"))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Durable state as seen by a freshly opened engine
    fn durable_state(dir: &TempDir) -> (Hash, BalanceSheet) {
        let engine = BatchEngine::open(engine_config(dir)).unwrap();
        (engine.state_root(), engine.balances())
    }

    #[test]
    fn test_verification_failure_commits_nothing() {
        let dir = TempDir::new().unwrap();
        let before = {
            let engine = open(&dir, RejectingVerifier::new([TxId(2)]), ZeroSumConservation);
            let before = (engine.state_root(), engine.balances());

            let err = engine.submit(batch()).unwrap_err();
            assert!(matches!(
                err,
                EngineError::Execution(ExecutionError::TransactionFailed {
                    tx: TxId(2),
                    failure: TxFailure::Rejected(_),
                })
            ));
            assert_eq!(engine.state_root(), before.0);
            assert_eq!(log_records(&dir), 0);
            before
        };

        assert_eq!(durable_state(&dir), before);
    }

    #[test]
    fn test_conservation_failure_commits_nothing() {
        let dir = TempDir::new().unwrap();
        let before = {
            let engine = open(&dir, AcceptAllVerifier, CappedConservation(20));
            let before = (engine.state_root(), engine.balances());

            let err = engine.submit(batch()).unwrap_err();
            assert!(matches!(
                err,
                EngineError::Execution(ExecutionError::TransactionFailed {
                    failure: TxFailure::Conservation(_),
                    ..
                })
            ));
            before
        };

        let (root, balances) = durable_state(&dir);
        assert_eq!(root, before.0);
        assert_eq!(balances, before.1);
        assert_eq!(balances.get(&account("d")), Some(&0));
    }

    #[test]
    fn test_cycle_rejected_before_logging() {
        let dir = TempDir::new().unwrap();
        let engine = open(&dir, AcceptAllVerifier, ZeroSumConservation);
        let root = engine.state_root();

        let err = engine
            .submit(vec![
                Transaction::transfer(1, "a", "b", 1).with_prerequisites(vec![TxId(2)]),
                Transaction::transfer(2, "c", "d", 1).with_prerequisites(vec![TxId(1)]),
            ])
            .unwrap_err();

        match err {
            EngineError::Analysis(AnalysisError::CircularDependency { cycle }) => {
                assert!(cycle.len() >= 3);
                assert_eq!(cycle.first(), cycle.last());
            }
            other => panic!("expected a cycle, got {other}"),
        }
        assert_eq!(engine.state_root(), root);
        assert_eq!(log_records(&dir), 0);
    }

    #[test]
    fn test_engine_usable_after_rejection() {
        let dir = TempDir::new().unwrap();
        let engine = open(&dir, RejectingVerifier::new([TxId(3)]), ZeroSumConservation);

        assert!(engine.submit(batch()).is_err());
        let report = engine.submit(batch()[..2].to_vec()).unwrap();

        assert_eq!(report.applied(), vec![TxId(1), TxId(2)]);
        assert_eq!(engine.balance(&account("d")), Some(40));
    }
}
