//! # Cycle Rejection
//!
//! Batches with a cycle of length 2-5 are rejected with a closed loop made
//! only of transactions from the batch.

#[cfg(test)]
mod tests {
    use crate::fixtures::{account, declared, declared_analysis};
    use pl_01_dependency_analysis::{AnalysisError, DependencyAnalysisApi};
    use proptest::prelude::*;
    use shared_types::{AccountId, Operation, Transaction, TxId};
    use std::collections::{BTreeMap, BTreeSet};

    /// (cycle length, shuffled ids); the first `len` ids form the cycle
    fn cyclic_strategy() -> impl Strategy<Value = (usize, Vec<u64>)> {
        (2usize..=5, 0usize..=5).prop_flat_map(|(len, extra)| {
            let ids: Vec<u64> = (1..=(len + extra) as u64).collect();
            (Just(len), Just(ids).prop_shuffle())
        })
    }

    /// Each cycle member waits for the next; extras hang off the first member.
    /// Accounts are disjoint, so declared edges are the only edges.
    fn build(len: usize, ids: &[u64]) -> Vec<Transaction> {
        let cycle = &ids[..len];
        ids.iter()
            .enumerate()
            .map(|(index, id)| {
                let prerequisite = if index < len {
                    cycle[(index + 1) % len]
                } else {
                    cycle[0]
                };
                Transaction::new(*id, Operation::Opaque(id.to_be_bytes().to_vec()))
                    .with_writes(vec![AccountId::new(format!("own-{id}"))])
                    .with_prerequisites(vec![TxId(prerequisite)])
            })
            .collect()
    }

    fn assert_closed_loop(cycle: &[TxId], batch: &[Transaction]) {
        let prerequisites: BTreeMap<TxId, &Vec<TxId>> =
            batch.iter().map(|tx| (tx.id, &tx.after)).collect();

        assert!(cycle.len() >= 3, "cycle too short: {cycle:?}");
        assert_eq!(cycle.first(), cycle.last());
        for pair in cycle.windows(2) {
            let waits = prerequisites.get(&pair[1]).expect("cycle names unknown transaction");
            assert!(waits.contains(&pair[0]), "{} -> {} is not an edge", pair[0], pair[1]);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn prop_cycles_rejected_with_valid_loop((len, ids) in cyclic_strategy()) {
            let batch = build(len, &ids);

            let err = declared_analysis().analyze(&batch).unwrap_err();
            let cycle = match err {
                AnalysisError::CircularDependency { cycle } => cycle,
                other => return Err(TestCaseError::fail(format!("expected a cycle, got {other}"))),
            };

            assert_closed_loop(&cycle, &batch);

            let members: BTreeSet<TxId> = cycle.iter().copied().collect();
            let expected: BTreeSet<TxId> = ids[..len].iter().map(|id| TxId(*id)).collect();
            prop_assert_eq!(members, expected);
            prop_assert_eq!(cycle.len(), len + 1);
        }

        #[test]
        fn prop_cycle_report_repeatable((len, ids) in cyclic_strategy()) {
            let batch = build(len, &ids);
            let first = declared_analysis().analyze(&batch).unwrap_err();
            let second = declared_analysis().analyze(&batch).unwrap_err();
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn test_access_edge_closes_cycle() {
        let shared = account("shared");
        // T1 precedes T2 on the shared account; T1 also waits for T2
        let batch = vec![
            declared(1, &[], &[&shared]).with_prerequisites(vec![TxId(2)]),
            declared(2, &[&shared], &[]),
        ];

        let err = declared_analysis().analyze(&batch).unwrap_err();
        let cycle = err.cycle().expect("cycle error").to_vec();

        assert_eq!(cycle.len(), 3);
        assert_eq!(cycle.first(), cycle.last());
        assert!(cycle.contains(&TxId(1)) && cycle.contains(&TxId(2)));
    }
}
