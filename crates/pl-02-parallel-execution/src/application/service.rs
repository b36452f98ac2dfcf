//! # Parallel Executor Service
//!
//! Runs an analyzed batch wave by wave on a fixed-size rayon pool.
//!
//! ## Execution model
//!
//! - Waves run strictly in order with a barrier between them.
//! - Workers of one wave read the same pre-wave balance sheet. Transactions
//!   sharing a wave never conflict, so none can observe another's writes.
//! - After the barrier, effects are merged on the calling thread in id order
//!   and stamped with a logical apply time.
//! - The main segment runs first, then the quarantine segment. A quarantine
//!   failure rolls back that segment only.

use crate::algorithms::{
    apply_operation, prove_linearizable, split_schedule, taint_closure,
    LinearizabilityCertificate,
};
use crate::config::ExecutionConfig;
use crate::domain::entities::{
    BatchExecution, ExecutionStats, ExecutionTrace, TraceEntry, TxOutcome, TxStatus,
};
use crate::domain::errors::{ExecutionError, TxFailure};
use crate::domain::value_objects::{AtomicityMode, Segment};
use crate::ports::inbound::ParallelExecutionApi;
use crate::ports::outbound::{ConservationChecker, SecurityScreen, Verifier};
use pl_01_dependency_analysis::{AnalysisOutcome, DependencyGraph};
use rayon::prelude::*;
use shared_types::{AbortSignal, AccountMutation, BalanceSheet, Transaction, TxId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

type TxResult = Result<Vec<AccountMutation>, TxFailure>;

/// Results of one segment run
#[derive(Default)]
struct SegmentRun {
    results: BTreeMap<TxId, TxResult>,
    first_failure: Option<(TxId, TxFailure)>,
    waves: usize,
    max_wave_size: usize,
}

/// Mutable state threaded through both segments
struct RunState<'a> {
    state: BalanceSheet,
    trace: ExecutionTrace,
    clock: u64,
    next_wave: usize,
    abort: &'a AbortSignal,
}

/// The Parallel Executor.
///
/// Generic over its three collaborators so tests and the runtime can inject
/// their own verifier, conservation check and security screen.
pub struct ParallelExecutor<V: Verifier, C: ConservationChecker, S: SecurityScreen> {
    config: ExecutionConfig,
    verifier: V,
    conservation: C,
    screen: S,
    pool: rayon::ThreadPool,
}

impl<V: Verifier, C: ConservationChecker, S: SecurityScreen> ParallelExecutor<V, C, S> {
    /// Build the executor and its worker pool.
    pub fn new(
        config: ExecutionConfig,
        verifier: V,
        conservation: C,
        screen: S,
    ) -> Result<Self, ExecutionError> {
        let mut builder =
            rayon::ThreadPoolBuilder::new().thread_name(|index| format!("pl-exec-{}", index));
        if config.worker_threads > 0 {
            builder = builder.num_threads(config.worker_threads);
        }
        let pool = builder
            .build()
            .map_err(|e| ExecutionError::WorkerPool(e.to_string()))?;

        info!(
            workers = pool.current_num_threads(),
            atomicity = ?config.atomicity,
            "[pl-02] Parallel executor ready"
        );

        Ok(Self {
            config,
            verifier,
            conservation,
            screen,
            pool,
        })
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Verify, transition and conservation-check one transaction.
    fn run_one(&self, tx: &Transaction, state: &BalanceSheet) -> TxResult {
        self.verifier.verify(tx)?;
        let mutations = apply_operation(tx, state)?;
        let deltas: Vec<_> = mutations.iter().map(|m| m.delta()).collect();
        self.conservation.check_conservation(&deltas)?;
        Ok(mutations)
    }

    /// Run one wave against a frozen sheet. Output order equals `wave` order.
    fn run_wave(
        &self,
        wave: &[TxId],
        transactions: &BTreeMap<TxId, &Transaction>,
        state: &BalanceSheet,
    ) -> Result<Vec<(TxId, TxResult)>, ExecutionError> {
        let lookup = |id: &TxId| {
            transactions
                .get(id)
                .copied()
                .ok_or(ExecutionError::UnknownTransaction(*id))
        };

        // Resolve ids before dispatch so workers never fail on lookup
        let jobs: Vec<(TxId, &Transaction)> = wave
            .iter()
            .map(|id| lookup(id).map(|tx| (*id, tx)))
            .collect::<Result<_, _>>()?;

        let results: Vec<(TxId, TxResult)> = if jobs.len() < self.config.parallel_threshold {
            jobs.iter()
                .map(|(id, tx)| (*id, self.run_one(tx, state)))
                .collect()
        } else {
            self.pool.install(|| {
                jobs.par_iter()
                    .map(|(id, tx)| (*id, self.run_one(tx, state)))
                    .collect()
            })
        };

        Ok(results)
    }

    /// Run the waves of one segment, merging effects after each barrier.
    ///
    /// With `stop_on_failure`, the segment ends after the wave holding the
    /// first failure; later waves are traced but never run.
    fn run_segment(
        &self,
        segment: Segment,
        waves: &[Vec<TxId>],
        transactions: &BTreeMap<TxId, &Transaction>,
        run: &mut RunState<'_>,
        stop_on_failure: bool,
    ) -> Result<SegmentRun, ExecutionError> {
        let mut out = SegmentRun::default();
        let mut stopped = false;

        for wave in waves {
            let wave_index = run.next_wave;
            run.next_wave += 1;

            if stopped {
                for tx in wave {
                    run.trace.push(TraceEntry {
                        tx: *tx,
                        wave: wave_index,
                        segment,
                        applied_at: None,
                    });
                }
                continue;
            }

            if run.abort.is_aborted() {
                warn!(wave = wave_index, "[pl-02] Batch aborted between waves");
                return Err(ExecutionError::Aborted { wave: wave_index });
            }

            out.waves += 1;
            out.max_wave_size = out.max_wave_size.max(wave.len());
            debug!(
                wave = wave_index,
                %segment,
                size = wave.len(),
                "[pl-02] Dispatching wave"
            );

            let results = self.run_wave(wave, transactions, &run.state)?;

            // Barrier passed: merge in id order
            for (tx, result) in results {
                let applied_at = match &result {
                    Ok(mutations) => {
                        for mutation in mutations {
                            run.state.insert(mutation.account.clone(), mutation.post);
                        }
                        let at = run.clock;
                        run.clock += 1;
                        Some(at)
                    }
                    Err(failure) => {
                        warn!(%tx, %segment, %failure, "[pl-02] Transaction failed");
                        if out.first_failure.is_none() {
                            out.first_failure = Some((tx, failure.clone()));
                        }
                        None
                    }
                };

                run.trace.push(TraceEntry {
                    tx,
                    wave: wave_index,
                    segment,
                    applied_at,
                });
                out.results.insert(tx, result);
            }

            if stop_on_failure && out.first_failure.is_some() {
                stopped = true;
            }
        }

        Ok(out)
    }
}

impl<V: Verifier, C: ConservationChecker, S: SecurityScreen> ParallelExecutionApi
    for ParallelExecutor<V, C, S>
{
    fn execute(
        &self,
        batch: &[Transaction],
        analysis: &AnalysisOutcome,
        state: &BalanceSheet,
        abort: &AbortSignal,
    ) -> Result<BatchExecution, ExecutionError> {
        let transactions: BTreeMap<TxId, &Transaction> =
            batch.iter().map(|tx| (tx.id, tx)).collect();

        // 1. Screening, in id order
        let mut suspicious = BTreeSet::new();
        for (id, tx) in &transactions {
            if let Some(reason) = self.screen.screen(tx) {
                info!(tx = %id, %reason, "[pl-02] Transaction quarantined");
                suspicious.insert(*id);
            }
        }
        let quarantined = taint_closure(&analysis.graph, &suspicious);
        let (main_waves, quarantine_waves) = split_schedule(&analysis.schedule, &quarantined);

        info!(
            tx_count = batch.len(),
            main_waves = main_waves.len(),
            quarantine_waves = quarantine_waves.len(),
            quarantined = quarantined.len(),
            "[pl-02] Executing batch"
        );

        let mut run = RunState {
            state: state.clone(),
            trace: ExecutionTrace::new(),
            clock: 0,
            next_wave: 0,
            abort,
        };

        // 2. Main segment
        let stop_main = self.config.atomicity == AtomicityMode::AllOrNothing;
        let main = self.run_segment(Segment::Main, &main_waves, &transactions, &mut run, stop_main)?;

        if stop_main {
            if let Some((tx, failure)) = main.first_failure.clone() {
                return Err(ExecutionError::TransactionFailed { tx, failure });
            }
        }

        // 3. Quarantine segment, isolated
        let before_quarantine = run.state.clone();
        let isolated = self.run_segment(
            Segment::Quarantine,
            &quarantine_waves,
            &transactions,
            &mut run,
            true,
        )?;
        let dropped_by = isolated.first_failure.as_ref().map(|(tx, _)| *tx);
        if let Some(failed) = dropped_by {
            warn!(%failed, "[pl-02] Quarantine segment dropped");
            run.state = before_quarantine;
            run.trace.retract_segment(Segment::Quarantine);
        }

        // 4. Outcomes, ascending by id
        let mut outcomes = Vec::with_capacity(transactions.len());
        for id in transactions.keys() {
            let segment = if quarantined.contains(id) {
                Segment::Quarantine
            } else {
                Segment::Main
            };
            let result = main.results.get(id).or_else(|| isolated.results.get(id));

            let (status, mutations) = match (segment, dropped_by, result) {
                (Segment::Quarantine, Some(failed), Some(Err(failure))) if failed == *id => {
                    (TxStatus::Failed(failure.clone()), Vec::new())
                }
                (Segment::Quarantine, Some(failed), _) => {
                    (TxStatus::Failed(TxFailure::QuarantineDropped { failed }), Vec::new())
                }
                (_, _, Some(Ok(mutations))) => (TxStatus::Applied, mutations.clone()),
                (_, _, Some(Err(failure))) => (TxStatus::Failed(failure.clone()), Vec::new()),
                (_, _, None) => return Err(ExecutionError::UnknownTransaction(*id)),
            };

            outcomes.push(TxOutcome {
                tx: *id,
                segment,
                status,
                mutations,
            });
        }

        let applied = outcomes.iter().filter(|o| o.status.is_applied()).count();
        let execution = BatchExecution {
            stats: ExecutionStats {
                tx_count: outcomes.len(),
                wave_count: main.waves + isolated.waves,
                max_wave_size: main.max_wave_size.max(isolated.max_wave_size),
                applied,
                failed: outcomes.len() - applied,
                quarantined: quarantined.len(),
                workers: self.workers(),
            },
            outcomes,
            trace: run.trace,
            final_state: run.state,
        };

        // 5. Net effect of the batch
        if self.config.batch_conservation {
            self.conservation
                .check_conservation(&execution.net_deltas())
                .map_err(ExecutionError::BatchConservation)?;
        }

        info!(
            applied = execution.stats.applied,
            failed = execution.stats.failed,
            waves = execution.stats.wave_count,
            "[pl-02] Batch executed"
        );

        Ok(execution)
    }

    fn prove(&self, graph: &DependencyGraph, trace: &ExecutionTrace) -> LinearizabilityCertificate {
        let certificate = prove_linearizable(graph, trace);
        if let Some((from, to)) = certificate.violation {
            warn!(%from, %to, "[pl-02] Linearizability violation");
        }
        certificate
    }
}
