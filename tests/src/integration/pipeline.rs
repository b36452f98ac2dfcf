//! # End-to-End Pipeline
//!
//! Analysis, execution, audit and commit for well-formed batches.

#[cfg(test)]
mod tests {
    use crate::fixtures::{account, engine_config, seeded_engine};
    use pl_01_dependency_analysis::{
        AnalysisError, ConflictKind, ConservativeAccessAnalyzer, DependencyAnalysisApi,
        DependencyAnalysisService, InMemoryAccountDirectory,
    };
    use pl_runtime::{BatchEngine, EngineError};
    use shared_types::{Operation, Transaction, TxId};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// T1 reads A and writes B; T2 writes A.
    fn scenario_batch() -> Vec<Transaction> {
        vec![
            Transaction::transfer(1, "B", "C", 10).with_reads(vec![account("B"), account("A")]),
            Transaction::transfer(2, "A", "D", 5),
        ]
    }

    const SCENARIO_ACCOUNTS: &[(&str, u128)] = &[("A", 100), ("B", 50), ("C", 0), ("D", 0)];

    // =========================================================================
    // EXAMPLE SCENARIO
    // =========================================================================

    #[test]
    fn test_scenario_single_edge_two_waves() {
        let dir = TempDir::new().unwrap();
        let engine = seeded_engine(&dir, SCENARIO_ACCOUNTS);
        let prior_root = engine.state_root();

        let report = engine.submit(scenario_batch()).unwrap();

        assert_eq!(report.conflicts.edges.len(), 1);
        let edge = &report.conflicts.edges[0];
        assert_eq!((edge.source, edge.target), (TxId(1), TxId(2)));
        assert_eq!(edge.kind, ConflictKind::WriteAfterRead);
        assert_eq!(edge.accounts, vec![account("A")]);

        assert_eq!(report.wave_count(), 2);
        assert_eq!(report.schedule.waves[0].transactions, vec![TxId(1)]);
        assert_eq!(report.schedule.waves[1].transactions, vec![TxId(2)]);
        assert!(report.certificate.linearizable);
        assert_eq!(report.certificate.serial_order, vec![TxId(1), TxId(2)]);

        assert_ne!(report.receipt.root, prior_root);
        assert_eq!(report.receipt.previous_root, prior_root);
        assert_eq!(engine.balance(&account("A")), Some(95));
        assert_eq!(engine.balance(&account("B")), Some(40));
        assert_eq!(engine.balance(&account("C")), Some(10));
        assert_eq!(engine.balance(&account("D")), Some(5));
    }

    #[test]
    fn test_scenario_resolution_repeatable() {
        let directory = Arc::new(InMemoryAccountDirectory::new(
            SCENARIO_ACCOUNTS.iter().map(|(name, _)| account(name)),
        ));
        let batch = scenario_batch();

        let runs: Vec<Vec<u8>> = (0..5)
            .map(|_| {
                let service = DependencyAnalysisService::new(
                    Default::default(),
                    ConservativeAccessAnalyzer::new(),
                    Arc::clone(&directory),
                );
                service.analyze(&batch).unwrap().schedule.to_canonical_bytes()
            })
            .collect();

        assert!(runs.windows(2).all(|pair| pair[0] == pair[1]));
    }

    // =========================================================================
    // OPERATIONS
    // =========================================================================

    #[test]
    fn test_payroll_after_funding() {
        let dir = TempDir::new().unwrap();
        let engine = seeded_engine(
            &dir,
            &[("treasury", 1_000), ("payer", 0), ("ann", 0), ("ben", 0)],
        );

        let payroll = Transaction::new(
            2,
            Operation::Payroll {
                payer: account("payer"),
                payees: vec![(account("ann"), 300), (account("ben"), 200)],
            },
        )
        .with_writes(vec![account("payer"), account("ann"), account("ben")])
        .with_prerequisites(vec![TxId(1)]);

        let report = engine
            .submit(vec![
                Transaction::transfer(1, "treasury", "payer", 500),
                payroll,
            ])
            .unwrap();

        assert_eq!(report.certificate.serial_order, vec![TxId(1), TxId(2)]);
        assert_eq!(engine.balance(&account("payer")), Some(0));
        assert_eq!(engine.balance(&account("ann")), Some(300));
        assert_eq!(engine.balance(&account("ben")), Some(200));
    }

    #[test]
    fn test_liquidation_sweeps_balance() {
        let dir = TempDir::new().unwrap();
        let engine = seeded_engine(&dir, &[("debtor", 70), ("creditor", 30), ("other", 5)]);

        let sweep = Transaction::new(
            1,
            Operation::Liquidation {
                account: account("debtor"),
                beneficiary: account("creditor"),
            },
        )
        .with_writes(vec![account("debtor"), account("creditor")]);

        let report = engine
            .submit(vec![sweep, Transaction::transfer(2, "other", "creditor", 5)])
            .unwrap();

        assert_eq!(report.wave_count(), 2);
        assert_eq!(engine.balance(&account("debtor")), Some(0));
        assert_eq!(engine.balance(&account("creditor")), Some(105));
    }

    #[test]
    fn test_independent_transfers_share_one_wave() {
        let dir = TempDir::new().unwrap();
        let names: Vec<String> = (0..16).map(|i| format!("w{i:02}")).collect();
        let balances: Vec<(&str, u128)> = names.iter().map(|n| (n.as_str(), 10)).collect();
        let engine = seeded_engine(&dir, &balances);

        let batch: Vec<Transaction> = (0..8)
            .map(|i| {
                Transaction::transfer(i as u64 + 1, names[2 * i].as_str(), names[2 * i + 1].as_str(), 1)
            })
            .collect();
        let report = engine.submit(batch).unwrap();

        assert_eq!(report.wave_count(), 1);
        assert_eq!(report.schedule.max_parallelism, 8);
        assert!(report.conflicts.edges.is_empty());
        assert_eq!(engine.balance(&account("w01")), Some(11));
    }

    #[test]
    fn test_same_result_across_worker_counts() {
        let batch: Vec<Transaction> = (1..=24u64)
            .map(|i| Transaction::transfer(i, format!("p{}", i % 6), format!("p{}", (i * 5 + 1) % 6), 1))
            .collect();

        let outcomes: Vec<_> = [1usize, 2, 8]
            .iter()
            .map(|workers| {
                let dir = TempDir::new().unwrap();
                let mut config = engine_config(&dir);
                config.execution.worker_threads = *workers;
                let engine = BatchEngine::open(config).unwrap();
                engine
                    .seed_accounts((0..6).map(|i| (account(&format!("p{i}")), 100)).collect())
                    .unwrap();

                let report = engine.submit(batch.clone()).unwrap();
                (
                    report.schedule.to_canonical_bytes(),
                    report.certificate.serial_order,
                    report.receipt.root,
                )
            })
            .collect();

        assert!(outcomes.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[test]
    fn test_successive_batches_chain_roots() {
        let dir = TempDir::new().unwrap();
        let engine = seeded_engine(&dir, &[("x", 10), ("y", 10)]);

        let first = engine.submit(vec![Transaction::transfer(1, "x", "y", 4)]).unwrap();
        let second = engine.submit(vec![Transaction::transfer(1, "y", "x", 2)]).unwrap();

        assert_eq!(second.receipt.previous_root, first.receipt.root);
        assert_eq!(second.receipt.batch_seq, first.receipt.batch_seq + 1);
        assert_eq!(engine.balance(&account("x")), Some(8));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let dir = TempDir::new().unwrap();
        let engine = seeded_engine(&dir, &[("x", 10), ("y", 10)]);

        let err = engine
            .submit(vec![
                Transaction::transfer(1, "x", "y", 1),
                Transaction::transfer(1, "y", "x", 1),
            ])
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Analysis(AnalysisError::MalformedTransaction { tx: TxId(1), .. })
        ));
    }
}
