//! # Batch Engine
//!
//! Runs a submitted batch through every stage:
//!
//! ```text
//! submit ──→ Dependency Analysis (pl-01) ──→ Parallel Execution (pl-02)
//!                                                   │
//!                                      Linearizability audit
//!                                                   │
//!                                                   ↓
//!                                        Atomic Commit (pl-03)
//! ```
//!
//! Only one batch is in flight at a time. Execution starts from the
//! committed balances, so the commit manager's stale pre-image check never
//! fires for batches submitted through the engine.

use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::report::BatchReport;
use parking_lot::Mutex;
use pl_01_dependency_analysis::{
    ConservativeAccessAnalyzer, DependencyAnalysisApi, DependencyAnalysisService,
    InMemoryAccountDirectory,
};
use pl_02_parallel_execution::{
    AcceptAllVerifier, BatchExecution, ConservationChecker, ParallelExecutionApi,
    ParallelExecutor, QuarantineRules, RuleBasedScreen, SecurityScreen, TxStatus, Verifier,
    ZeroSumConservation,
};
use pl_03_atomic_commit::{
    AtomicCommitApi, CommitBatch, CommitManager, CommitReceipt, CommitState, RecoveryReport,
    TxEffects,
};
use shared_types::{AbortSignal, AccountId, Balance, BalanceSheet, Hash, Transaction, TxId};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

type Analysis = DependencyAnalysisService<ConservativeAccessAnalyzer, InMemoryAccountDirectory>;

/// The batch submission pipeline.
pub struct BatchEngine<
    V: Verifier = AcceptAllVerifier,
    C: ConservationChecker = ZeroSumConservation,
    S: SecurityScreen = RuleBasedScreen,
> {
    config: EngineConfig,
    directory: Arc<InMemoryAccountDirectory>,
    analysis: Analysis,
    executor: ParallelExecutor<V, C, S>,
    commit: CommitManager,
    in_flight: Mutex<()>,
}

impl BatchEngine {
    /// Open with the default verifier, zero-sum conservation and an empty
    /// quarantine rule set.
    pub fn open(config: EngineConfig) -> Result<Self, EngineError> {
        let screen = RuleBasedScreen::new(Arc::new(QuarantineRules::default()));
        Self::open_with(config, AcceptAllVerifier, ZeroSumConservation, screen)
    }
}

impl<V: Verifier, C: ConservationChecker, S: SecurityScreen> BatchEngine<V, C, S> {
    /// Open with caller-supplied executor collaborators.
    pub fn open_with(
        config: EngineConfig,
        verifier: V,
        conservation: C,
        screen: S,
    ) -> Result<Self, EngineError> {
        let commit = CommitManager::open(config.commit.clone())?;

        if commit.needs_recovery() {
            if config.recover_on_open {
                pl_telemetry::log_event!(
                    warn,
                    "pl-00",
                    "Data directory needs recovery, recovering before accepting batches"
                );
                commit.recover_from_crash()?;
            } else {
                pl_telemetry::log_event!(
                    warn,
                    "pl-00",
                    "Data directory needs recovery; batches will be refused until it runs"
                );
            }
        }

        let directory = Arc::new(InMemoryAccountDirectory::new(commit.balances().into_keys()));
        let analysis = DependencyAnalysisService::new(
            config.analysis.clone(),
            ConservativeAccessAnalyzer::new(),
            Arc::clone(&directory),
        );
        let executor =
            ParallelExecutor::new(config.execution.clone(), verifier, conservation, screen)?;

        info!(
            data_dir = %config.commit.data_dir.display(),
            accounts = directory.len(),
            batch_seq = commit.batch_seq(),
            root = %hex::encode(commit.state_root()),
            "[pl-00] Batch engine ready"
        );

        Ok(Self {
            config,
            directory,
            analysis,
            executor,
            commit,
            in_flight: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Direct access to the commit manager, e.g. for its audit sink
    pub fn commit_manager(&self) -> &CommitManager {
        &self.commit
    }

    pub fn executor(&self) -> &ParallelExecutor<V, C, S> {
        &self.executor
    }

    /// Process one batch to completion.
    pub fn submit(&self, batch: Vec<Transaction>) -> Result<BatchReport, EngineError> {
        self.submit_with_abort(batch, &AbortSignal::new())
    }

    /// Process one batch, honouring `abort` up to the commit's apply phase.
    ///
    /// Nothing is written unless every stage succeeds and the executed
    /// trace proves linearizable.
    pub fn submit_with_abort(
        &self,
        batch: Vec<Transaction>,
        abort: &AbortSignal,
    ) -> Result<BatchReport, EngineError> {
        let _guard = self.in_flight.lock();
        let span =
            pl_telemetry::subsystem_span!("submit_batch", subsystem = "pl-00", tx_count = batch.len());
        let _entered = span.enter();

        let analysis = self.analysis.analyze(&batch)?;
        let committed = self.commit.balances();
        let execution = self.executor.execute(&batch, &analysis, &committed, abort)?;

        let certificate = self.executor.prove(&analysis.graph, &execution.trace);
        if let Some((from, to)) = certificate.violation {
            warn!(%from, %to, "[pl-00] Execution trace not linearizable, batch rejected");
            return Err(EngineError::NotLinearizable { from, to });
        }

        for outcome in &execution.outcomes {
            if let TxStatus::Failed(failure) = &outcome.status {
                pl_telemetry::log_tx_event!(
                    info,
                    "pl-00",
                    "Transaction produced no effects",
                    outcome.tx,
                    reason = %failure
                );
            }
        }

        let receipt = self.commit.commit(commit_batch(&batch, &execution), abort)?;
        self.directory.replace(self.commit.balances().into_keys());

        pl_telemetry::log_batch_event!(
            info,
            "pl-00",
            "Batch processed",
            receipt.batch_seq,
            batch.len(),
            waves = analysis.schedule.waves.len(),
            applied = execution.stats.applied,
            failed = execution.stats.failed,
            root = %receipt.root_hex()
        );

        Ok(BatchReport {
            receipt,
            schedule: analysis.schedule,
            conflicts: analysis.conflicts,
            outcomes: execution.outcomes,
            certificate,
            stats: execution.stats,
        })
    }

    /// Open accounts with initial balances.
    pub fn seed_accounts(
        &self,
        balances: Vec<(AccountId, Balance)>,
    ) -> Result<CommitReceipt, EngineError> {
        let _guard = self.in_flight.lock();
        let accounts: Vec<AccountId> = balances.iter().map(|(id, _)| id.clone()).collect();
        let receipt = self.commit.seed_accounts(balances)?;
        for account in accounts {
            self.directory.insert(account);
        }
        Ok(receipt)
    }

    pub fn recover_from_crash(&self) -> Result<RecoveryReport, EngineError> {
        let _guard = self.in_flight.lock();
        let outcome = self.commit.recover_from_crash();
        self.directory.replace(self.commit.balances().into_keys());
        Ok(outcome?)
    }

    pub fn resume_after_manual_repair(&self) -> Result<Hash, EngineError> {
        let _guard = self.in_flight.lock();
        let root = self.commit.resume_after_manual_repair()?;
        self.directory.replace(self.commit.balances().into_keys());
        Ok(root)
    }

    pub fn state_root(&self) -> Hash {
        self.commit.state_root()
    }

    pub fn balances(&self) -> BalanceSheet {
        self.commit.balances()
    }

    pub fn balance(&self, account: &AccountId) -> Option<Balance> {
        self.commit.balance(account)
    }

    pub fn commit_state(&self) -> CommitState {
        self.commit.state()
    }

    pub fn needs_recovery(&self) -> bool {
        self.commit.needs_recovery()
    }
}

/// Applied effects in apply order, each tagged with its transaction digest.
fn commit_batch(batch: &[Transaction], execution: &BatchExecution) -> CommitBatch {
    let digests: BTreeMap<TxId, Hash> = batch.iter().map(|tx| (tx.id, tx.digest())).collect();

    CommitBatch::new(
        execution
            .applied_mutations()
            .into_iter()
            .filter_map(|(tx, mutations)| {
                digests
                    .get(&tx)
                    .map(|digest| TxEffects::new(tx, *digest, mutations))
            })
            .collect(),
    )
}
