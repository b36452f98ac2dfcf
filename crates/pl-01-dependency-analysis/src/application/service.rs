//! Dependency Analysis Service
//!
//! Main service implementing DependencyAnalysisApi.

use crate::algorithms::{
    build_dependency_graph, detect_conflicts, ensure_acyclic, resolve_waves, ConflictReport,
};
use crate::config::AnalysisConfig;
use crate::domain::entities::{AnnotatedTransaction, DependencyGraph, ResolvedSchedule};
use crate::domain::errors::{AnalysisError, MalformedReason};
use crate::domain::invariants;
use crate::ports::inbound::DependencyAnalysisApi;
use crate::ports::outbound::{AccessAnalyzer, AccountDirectory};
use shared_types::{Transaction, TxId};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Everything the later stages need from analysis
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    /// Graph including any edges the detector had to add
    pub graph: DependencyGraph,
    /// Classified conflicts
    pub conflicts: ConflictReport,
    /// Canonical wave partition
    pub schedule: ResolvedSchedule,
}

/// Dependency Analysis Service
///
/// Orchestrates the analysis pipeline:
/// 1. Validate the batch
/// 2. Derive conservative access sets
/// 3. Build the dependency graph
/// 4. Classify conflicts and reject cycles
/// 5. Layer into waves
pub struct DependencyAnalysisService<A: AccessAnalyzer, D: AccountDirectory> {
    config: AnalysisConfig,
    analyzer: A,
    directory: Arc<D>,
}

impl<A: AccessAnalyzer, D: AccountDirectory> DependencyAnalysisService<A, D> {
    pub fn new(config: AnalysisConfig, analyzer: A, directory: Arc<D>) -> Self {
        Self {
            config,
            analyzer,
            directory,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Validate batch size, ids and prerequisites
    fn validate_batch(&self, batch: &[Transaction]) -> Result<(), AnalysisError> {
        if batch.is_empty() {
            return Err(AnalysisError::EmptyBatch);
        }

        if batch.len() > self.config.max_batch_size {
            return Err(AnalysisError::BatchTooLarge {
                size: batch.len(),
                max: self.config.max_batch_size,
            });
        }

        let mut seen: BTreeSet<TxId> = BTreeSet::new();
        for tx in batch {
            if !seen.insert(tx.id) {
                return Err(AnalysisError::MalformedTransaction {
                    tx: tx.id,
                    reason: MalformedReason::DuplicateId,
                });
            }
        }

        for tx in batch {
            for prerequisite in &tx.after {
                if *prerequisite == tx.id {
                    return Err(AnalysisError::MalformedTransaction {
                        tx: tx.id,
                        reason: MalformedReason::SelfPrerequisite,
                    });
                }
                if !seen.contains(prerequisite) {
                    return Err(AnalysisError::MalformedTransaction {
                        tx: tx.id,
                        reason: MalformedReason::UnknownPrerequisite(*prerequisite),
                    });
                }
            }
        }

        Ok(())
    }

    /// Derive effective access sets and check every account exists
    fn annotate(&self, batch: &[Transaction]) -> Result<Vec<AnnotatedTransaction>, AnalysisError> {
        let mut annotated = Vec::with_capacity(batch.len());

        for (position, tx) in batch.iter().enumerate() {
            let access = self.analyzer.analyze(tx)?;

            if self.config.require_known_accounts {
                if let Some(unknown) = access
                    .touched()
                    .into_iter()
                    .find(|account| !self.directory.contains(account))
                {
                    return Err(AnalysisError::MalformedTransaction {
                        tx: tx.id,
                        reason: MalformedReason::UnknownAccount(unknown),
                    });
                }
            }

            annotated.push(
                AnnotatedTransaction::new(tx.id, position, access)
                    .with_prerequisites(tx.after.clone()),
            );
        }

        Ok(annotated)
    }
}

impl<A: AccessAnalyzer, D: AccountDirectory> DependencyAnalysisApi
    for DependencyAnalysisService<A, D>
{
    fn analyze(&self, batch: &[Transaction]) -> Result<AnalysisOutcome, AnalysisError> {
        info!(tx_count = batch.len(), "[pl-01] Analyzing batch");

        let mut graph = self.build_graph(batch)?;
        let conflicts = DependencyAnalysisApi::detect_conflicts(self, &mut graph)?;
        let schedule = self.resolve(&graph)?;

        debug_assert!(invariants::invariant_topological_order(&schedule, &graph));
        debug_assert!(invariants::invariant_schedule_completeness(&schedule, &graph));
        debug_assert!(invariants::invariant_conflict_completeness(
            &graph,
            &conflicts.edges
        ));

        info!(
            total_transactions = schedule.total_transactions,
            waves = schedule.waves.len(),
            max_parallelism = schedule.max_parallelism,
            conflicts = conflicts.edges.len(),
            "[pl-01] Batch analysis complete"
        );

        Ok(AnalysisOutcome {
            graph,
            conflicts,
            schedule,
        })
    }

    fn build_graph(&self, batch: &[Transaction]) -> Result<DependencyGraph, AnalysisError> {
        self.validate_batch(batch)?;
        let annotated = self.annotate(batch)?;
        let graph = build_dependency_graph(annotated);

        // Anti-DoS bound on the quadratic edge set
        if graph.edge_count() > self.config.max_edge_count {
            return Err(AnalysisError::TooManyEdges {
                count: graph.edge_count(),
                max: self.config.max_edge_count,
            });
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "[pl-01] Dependency graph built"
        );

        Ok(graph)
    }

    fn detect_conflicts(&self, graph: &mut DependencyGraph) -> Result<ConflictReport, AnalysisError> {
        let report = detect_conflicts(graph);
        debug!(
            conflict_count = report.edges.len(),
            pairs_checked = report.pairs_checked,
            conflict_percent = report.conflict_percentage(),
            "[pl-01] Detected conflicts"
        );

        ensure_acyclic(graph)?;
        Ok(report)
    }

    fn resolve(&self, graph: &DependencyGraph) -> Result<ResolvedSchedule, AnalysisError> {
        resolve_waves(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{ConservativeAccessAnalyzer, InMemoryAccountDirectory};
    use crate::domain::value_objects::ConflictKind;
    use crate::ports::outbound::mocks::{DeclaredAccessAnalyzer, OpenDirectory};
    use shared_types::{AccountId, Operation};

    fn acc(name: &str) -> AccountId {
        AccountId::from(name)
    }

    fn service() -> DependencyAnalysisService<ConservativeAccessAnalyzer, InMemoryAccountDirectory> {
        let directory = InMemoryAccountDirectory::new(
            ["a", "b", "c", "d"].iter().map(|name| acc(name)),
        );
        DependencyAnalysisService::new(
            AnalysisConfig::default(),
            ConservativeAccessAnalyzer::new(),
            Arc::new(directory),
        )
    }

    fn declared_service() -> DependencyAnalysisService<DeclaredAccessAnalyzer, OpenDirectory> {
        DependencyAnalysisService::new(
            AnalysisConfig::default(),
            DeclaredAccessAnalyzer,
            Arc::new(OpenDirectory),
        )
    }

    fn opaque(id: u64, reads: &[&str], writes: &[&str]) -> Transaction {
        Transaction::new(id, Operation::Opaque(vec![]))
            .with_reads(reads.iter().map(|r| acc(r)).collect())
            .with_writes(writes.iter().map(|w| acc(w)).collect())
    }

    #[test]
    fn test_order_independent_transactions() {
        let outcome = service()
            .analyze(&[
                Transaction::transfer(1, "a", "b", 5),
                Transaction::transfer(2, "c", "d", 5),
            ])
            .unwrap();

        assert_eq!(outcome.schedule.waves.len(), 1);
        assert_eq!(outcome.schedule.max_parallelism, 2);
        assert!(outcome.conflicts.edges.is_empty());
    }

    #[test]
    fn test_order_dependent_transactions() {
        let outcome = service()
            .analyze(&[
                Transaction::transfer(1, "a", "b", 5),
                Transaction::transfer(2, "b", "c", 5),
            ])
            .unwrap();

        assert_eq!(outcome.schedule.waves.len(), 2);
        assert_eq!(outcome.schedule.flatten(), vec![TxId(1), TxId(2)]);
    }

    #[test]
    fn test_war_example_two_waves() {
        // T1 reads A writes B, T2 writes A
        let outcome = declared_service()
            .analyze(&[opaque(1, &["a"], &["b"]), opaque(2, &[], &["a"])])
            .unwrap();

        assert_eq!(outcome.conflicts.edges.len(), 1);
        assert_eq!(outcome.conflicts.edges[0].kind, ConflictKind::WriteAfterRead);
        assert_eq!(outcome.schedule.waves.len(), 2);
    }

    #[test]
    fn test_reject_empty_batch() {
        assert_eq!(service().analyze(&[]).unwrap_err(), AnalysisError::EmptyBatch);
    }

    #[test]
    fn test_reject_oversized_batch() {
        let service = DependencyAnalysisService::new(
            AnalysisConfig {
                max_batch_size: 2,
                ..Default::default()
            },
            DeclaredAccessAnalyzer,
            Arc::new(OpenDirectory),
        );

        let batch: Vec<_> = (0..5).map(|i| opaque(i, &[], &["a"])).collect();

        assert!(matches!(
            service.analyze(&batch),
            Err(AnalysisError::BatchTooLarge { size: 5, max: 2 })
        ));
    }

    #[test]
    fn test_reject_too_many_edges() {
        let service = DependencyAnalysisService::new(
            AnalysisConfig {
                max_edge_count: 2,
                ..Default::default()
            },
            DeclaredAccessAnalyzer,
            Arc::new(OpenDirectory),
        );

        // Four writers of one account: six edges
        let batch: Vec<_> = (0..4).map(|i| opaque(i, &[], &["a"])).collect();

        assert!(matches!(
            service.analyze(&batch),
            Err(AnalysisError::TooManyEdges { count: 6, max: 2 })
        ));
    }

    #[test]
    fn test_reject_unknown_account() {
        let result = service().analyze(&[Transaction::transfer(1, "a", "ghost", 5)]);

        assert_eq!(
            result.unwrap_err(),
            AnalysisError::MalformedTransaction {
                tx: TxId(1),
                reason: MalformedReason::UnknownAccount(acc("ghost")),
            }
        );
    }

    #[test]
    fn test_reject_duplicate_id() {
        let result = service().analyze(&[
            Transaction::transfer(1, "a", "b", 5),
            Transaction::transfer(1, "c", "d", 5),
        ]);

        assert!(matches!(
            result,
            Err(AnalysisError::MalformedTransaction {
                reason: MalformedReason::DuplicateId,
                ..
            })
        ));
    }

    #[test]
    fn test_reject_bad_prerequisites() {
        let unknown = Transaction::transfer(1, "a", "b", 5).with_prerequisites(vec![TxId(99)]);
        assert_eq!(
            service().analyze(&[unknown]).unwrap_err(),
            AnalysisError::MalformedTransaction {
                tx: TxId(1),
                reason: MalformedReason::UnknownPrerequisite(TxId(99)),
            }
        );

        let own = Transaction::transfer(1, "a", "b", 5).with_prerequisites(vec![TxId(1)]);
        assert!(matches!(
            service().analyze(&[own]),
            Err(AnalysisError::MalformedTransaction {
                reason: MalformedReason::SelfPrerequisite,
                ..
            })
        ));
    }

    #[test]
    fn test_declared_cycle_rejected() {
        // Both write "a" (1 -> 2); 1 also waits on 2
        let first = Transaction::transfer(1, "a", "b", 5).with_prerequisites(vec![TxId(2)]);
        let second = Transaction::transfer(2, "a", "c", 5);

        let err = service().analyze(&[first, second]).unwrap_err();

        assert_eq!(err.cycle(), Some(&[TxId(1), TxId(2), TxId(1)][..]));
    }

    #[test]
    fn test_prerequisite_orders_independent_transactions() {
        let funding = Transaction::transfer(1, "a", "b", 5);
        let payroll = Transaction::transfer(2, "c", "d", 5).with_prerequisites(vec![TxId(1)]);

        let outcome = service().analyze(&[payroll, funding]).unwrap();

        assert_eq!(outcome.schedule.flatten(), vec![TxId(1), TxId(2)]);
        assert!(outcome.conflicts.edges.is_empty());
    }

    #[test]
    fn test_unknown_accounts_allowed_when_disabled() {
        let service = DependencyAnalysisService::new(
            AnalysisConfig {
                require_known_accounts: false,
                ..Default::default()
            },
            ConservativeAccessAnalyzer::new(),
            Arc::new(InMemoryAccountDirectory::default()),
        );

        assert!(service
            .analyze(&[Transaction::transfer(1, "x", "y", 1)])
            .is_ok());
    }
}
