//! # Scheduling Determinism
//!
//! The same batch always resolves to byte-identical schedules, and executes
//! to the same outcomes whatever the worker count.

#[cfg(test)]
mod tests {
    use crate::fixtures::account_pool;
    use pl_01_dependency_analysis::{
        AnalysisOutcome, ConservativeAccessAnalyzer, DependencyAnalysisApi,
        DependencyAnalysisService, InMemoryAccountDirectory,
    };
    use pl_02_parallel_execution::{
        AcceptAllVerifier, AtomicityMode, ExecutionConfig, NoQuarantine, ParallelExecutionApi,
        ParallelExecutor, ZeroSumConservation,
    };
    use proptest::collection::vec;
    use proptest::prelude::*;
    use shared_types::{AbortSignal, AccountId, BalanceSheet, Transaction, TxId};
    use std::sync::Arc;

    const POOL: usize = 8;

    /// (from, offset, amount, prerequisite back-reference)
    type Shape = (usize, usize, u128, Option<usize>);

    fn batch_strategy() -> impl Strategy<Value = Vec<Shape>> {
        vec((0..POOL, 1..POOL, 1u128..40, proptest::option::of(1usize..4)), 1..=24)
    }

    /// Prerequisites only point at earlier positions, so the batch is acyclic.
    fn build(shapes: &[Shape], pool: &[AccountId]) -> Vec<Transaction> {
        shapes
            .iter()
            .enumerate()
            .map(|(position, (from, offset, amount, back))| {
                let tx = Transaction::transfer(
                    position as u64 + 1,
                    pool[*from].clone(),
                    pool[(from + offset) % POOL].clone(),
                    *amount,
                );
                match back {
                    Some(back) if *back <= position => {
                        tx.with_prerequisites(vec![TxId((position - back) as u64 + 1)])
                    }
                    _ => tx,
                }
            })
            .collect()
    }

    fn analyze(batch: &[Transaction], pool: &[AccountId]) -> AnalysisOutcome {
        let service = DependencyAnalysisService::new(
            Default::default(),
            ConservativeAccessAnalyzer::new(),
            Arc::new(InMemoryAccountDirectory::new(pool.to_vec())),
        );
        service.analyze(batch).unwrap()
    }

    fn executor(workers: usize) -> ParallelExecutor<AcceptAllVerifier, ZeroSumConservation, NoQuarantine> {
        let config = ExecutionConfig {
            worker_threads: workers,
            atomicity: AtomicityMode::BestEffort,
            parallel_threshold: 1,
            ..ExecutionConfig::default()
        };
        ParallelExecutor::new(config, AcceptAllVerifier, ZeroSumConservation, NoQuarantine).unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_resolution_byte_identical(shapes in batch_strategy(), runs in 3usize..=6) {
            let pool = account_pool(POOL);
            let batch = build(&shapes, &pool);

            let first = analyze(&batch, &pool);
            let bytes = first.schedule.to_canonical_bytes();
            prop_assert!(!bytes.is_empty());

            for _ in 1..runs {
                let again = analyze(&batch, &pool);
                prop_assert_eq!(&again.schedule.to_canonical_bytes(), &bytes);
                prop_assert_eq!(again.schedule.fingerprint(), first.schedule.fingerprint());
                prop_assert_eq!(&again.conflicts, &first.conflicts);
            }
        }

        #[test]
        fn prop_execution_independent_of_workers(shapes in batch_strategy()) {
            let pool = account_pool(POOL);
            let batch = build(&shapes, &pool);
            let analysis = analyze(&batch, &pool);
            let state: BalanceSheet = pool.iter().map(|a| (a.clone(), 60)).collect();

            let results: Vec<_> = [1usize, 3, 8]
                .iter()
                .map(|workers| {
                    executor(*workers)
                        .execute(&batch, &analysis, &state, &AbortSignal::new())
                        .unwrap()
                })
                .collect();

            for other in &results[1..] {
                prop_assert_eq!(&other.outcomes, &results[0].outcomes);
                prop_assert_eq!(&other.final_state, &results[0].final_state);
                prop_assert_eq!(other.trace.serial_order(), results[0].trace.serial_order());
            }

            let certificate = executor(2).prove(&analysis.graph, &results[0].trace);
            prop_assert!(certificate.linearizable);
        }
    }

    #[test]
    fn test_scheduling_repeatable_under_load() {
        let pool = account_pool(POOL);
        let shapes: Vec<Shape> = (0..200)
            .map(|i| (i % POOL, 1 + i % (POOL - 1), 1, if i % 5 == 0 { Some(2) } else { None }))
            .collect();
        let batch = build(&shapes, &pool);

        let reference = analyze(&batch, &pool).schedule.to_canonical_bytes();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let batch = batch.clone();
                let pool = pool.clone();
                std::thread::spawn(move || analyze(&batch, &pool).schedule.to_canonical_bytes())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), reference);
        }
    }
}
