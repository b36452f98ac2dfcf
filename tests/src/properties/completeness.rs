//! # Conflict Completeness
//!
//! Every pair of transactions sharing an account under a conflicting mode
//! yields a classified edge, earlier position first.

#[cfg(test)]
mod tests {
    use crate::fixtures::{account_pool, declared_analysis};
    use pl_01_dependency_analysis::domain::invariants::invariant_conflict_completeness;
    use pl_01_dependency_analysis::{
        ConflictKind, ConservativeAccessAnalyzer, DependencyAnalysisApi,
        DependencyAnalysisService, InMemoryAccountDirectory,
    };
    use proptest::collection::{btree_set, vec};
    use proptest::prelude::*;
    use shared_types::{AccountId, Operation, Transaction, TxId};
    use std::collections::BTreeSet;
    use std::sync::Arc;

    const POOL: usize = 6;

    type Access = (BTreeSet<usize>, BTreeSet<usize>);

    /// Ids run backwards relative to position so edge direction cannot
    /// accidentally follow id order.
    fn id_at(position: usize) -> TxId {
        TxId(1_000 - position as u64 * 3)
    }

    /// Random declared sets plus one forced (writer, reader, account) triple
    fn batch_strategy() -> impl Strategy<Value = Vec<Access>> {
        vec((btree_set(0..POOL, 0..=3), btree_set(0..POOL, 0..=2)), 2..=12)
            .prop_flat_map(|txs| {
                let n = txs.len();
                (Just(txs), 0..n, 0..n, 0..POOL)
            })
            .prop_map(|(mut txs, writer, reader, shared)| {
                let reader = if reader == writer { (writer + 1) % txs.len() } else { reader };
                txs[writer].1.insert(shared);
                txs[reader].0.insert(shared);
                txs
            })
    }

    fn build(access: &[Access], pool: &[AccountId]) -> Vec<Transaction> {
        access
            .iter()
            .enumerate()
            .map(|(position, (reads, writes))| {
                Transaction::new(id_at(position), Operation::Opaque(vec![position as u8]))
                    .with_reads(reads.iter().map(|i| pool[*i].clone()).collect())
                    .with_writes(writes.iter().map(|i| pool[*i].clone()).collect())
            })
            .collect()
    }

    fn expected_kinds(earlier: &Access, later: &Access) -> BTreeSet<ConflictKind> {
        let mut kinds = BTreeSet::new();
        if !earlier.1.is_disjoint(&later.1) {
            kinds.insert(ConflictKind::WriteAfterWrite);
        }
        if !earlier.1.is_disjoint(&later.0) {
            kinds.insert(ConflictKind::ReadAfterWrite);
        }
        if !earlier.0.is_disjoint(&later.1) {
            kinds.insert(ConflictKind::WriteAfterRead);
        }
        kinds
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn prop_every_conflicting_pair_has_edge(access in batch_strategy()) {
            let pool = account_pool(POOL);
            let batch = build(&access, &pool);
            let outcome = declared_analysis().analyze(&batch).unwrap();

            for i in 0..access.len() {
                for j in (i + 1)..access.len() {
                    let (earlier, later) = (id_at(i), id_at(j));
                    let expected = expected_kinds(&access[i], &access[j]);
                    let found: BTreeSet<ConflictKind> = outcome
                        .conflicts
                        .edges
                        .iter()
                        .filter(|e| e.source == earlier && e.target == later)
                        .map(|e| e.kind)
                        .collect();

                    prop_assert_eq!(
                        &found, &expected,
                        "pair {} -> {} classified {:?}, expected {:?}",
                        earlier, later, found, expected
                    );
                    prop_assert_eq!(outcome.graph.has_edge(&earlier, &later), !expected.is_empty());
                    prop_assert!(!outcome.graph.has_edge(&later, &earlier));
                }
            }

            prop_assert!(invariant_conflict_completeness(&outcome.graph, &outcome.conflicts.edges));
            prop_assert!(outcome.conflicts.edges.iter().all(|e| !e.accounts.is_empty()));
        }

        #[test]
        fn prop_transfers_sharing_account_conflict(
            pairs in vec((0..POOL, 1..POOL, 1u128..50), 2..=16)
        ) {
            let pool = account_pool(POOL);
            let directory = Arc::new(InMemoryAccountDirectory::new(pool.clone()));
            let service = DependencyAnalysisService::new(
                Default::default(),
                ConservativeAccessAnalyzer::new(),
                directory,
            );

            let batch: Vec<Transaction> = pairs
                .iter()
                .enumerate()
                .map(|(position, (from, offset, amount))| {
                    Transaction::transfer(
                        id_at(position),
                        pool[*from].clone(),
                        pool[(from + offset) % POOL].clone(),
                        *amount,
                    )
                })
                .collect();
            let outcome = service.analyze(&batch).unwrap();

            for i in 0..batch.len() {
                for j in (i + 1)..batch.len() {
                    let shares = batch[i]
                        .referenced_accounts()
                        .iter()
                        .any(|a| batch[j].referenced_accounts().contains(a));
                    let waw = outcome.conflicts.edges.iter().any(|e| {
                        e.source == batch[i].id
                            && e.target == batch[j].id
                            && e.kind == ConflictKind::WriteAfterWrite
                    });

                    prop_assert_eq!(waw, shares);
                    prop_assert_eq!(outcome.graph.has_edge(&batch[i].id, &batch[j].id), shares);
                }
            }
        }
    }

    #[test]
    fn test_read_only_sharing_is_not_a_conflict() {
        let pool = account_pool(2);
        let batch = build(
            &[
                (BTreeSet::from([0]), BTreeSet::new()),
                (BTreeSet::from([0]), BTreeSet::from([1])),
            ],
            &pool,
        );

        let outcome = declared_analysis().analyze(&batch).unwrap();
        assert!(outcome.conflicts.edges.is_empty());
        assert_eq!(outcome.schedule.waves.len(), 1);
    }
}
