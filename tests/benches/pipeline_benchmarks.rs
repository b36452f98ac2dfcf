//! # Parallel-Ledger Pipeline Benchmarks
//!
//! | Stage | What is measured |
//! |-------|------------------|
//! | pl-01 Dependency Analysis | O(n²) conflict scan and wave layering |
//! | pl-02 Parallel Execution | Wave execution, 1 worker vs the full pool |
//! | pl-03 Atomic Commit | WAL append, apply and root persist per batch |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pl_01_dependency_analysis::{
    ConservativeAccessAnalyzer, DependencyAnalysisApi, DependencyAnalysisService,
    InMemoryAccountDirectory,
};
use pl_02_parallel_execution::{
    AcceptAllVerifier, AtomicityMode, ExecutionConfig, NoQuarantine, ParallelExecutionApi,
    ParallelExecutor, ZeroSumConservation,
};
use pl_runtime::{BatchEngine, EngineConfig};
use rand::{rngs::StdRng, Rng, SeedableRng};
use shared_types::{AbortSignal, AccountId, BalanceSheet, Transaction};
use std::sync::Arc;
use std::time::Duration;

fn accounts(n: usize) -> Vec<AccountId> {
    (0..n).map(|i| AccountId::new(format!("acct-{i:05}"))).collect()
}

/// Random transfers over `pool` accounts; fewer accounts means more conflicts
fn random_batch(size: usize, pool: &[AccountId], seed: u64) -> Vec<Transaction> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..size)
        .map(|i| {
            let from = rng.gen_range(0..pool.len());
            let offset = rng.gen_range(1..pool.len());
            Transaction::transfer(
                i as u64 + 1,
                pool[from].clone(),
                pool[(from + offset) % pool.len()].clone(),
                rng.gen_range(1..10),
            )
        })
        .collect()
}

fn analysis_service(
    pool: &[AccountId],
) -> DependencyAnalysisService<ConservativeAccessAnalyzer, InMemoryAccountDirectory> {
    DependencyAnalysisService::new(
        Default::default(),
        ConservativeAccessAnalyzer::new(),
        Arc::new(InMemoryAccountDirectory::new(pool.to_vec())),
    )
}

// ============================================================================
// PL-01: Dependency Analysis
// ============================================================================

fn bench_dependency_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("pl-01-dependency-analysis");
    group.measurement_time(Duration::from_secs(5));

    for (label, pool_size) in [("low-contention", 2_000), ("high-contention", 16)] {
        let pool = accounts(pool_size);
        let service = analysis_service(&pool);

        for size in [100usize, 500, 1_000] {
            let batch = random_batch(size, &pool, size as u64);
            group.throughput(Throughput::Elements(size as u64));
            group.bench_with_input(BenchmarkId::new(label, size), &batch, |b, batch| {
                b.iter(|| black_box(service.analyze(batch).map(|o| o.schedule.waves.len())))
            });
        }
    }

    group.finish();
}

// ============================================================================
// PL-02: Parallel Execution
// ============================================================================

fn bench_parallel_execution(c: &mut Criterion) {
    let mut group = c.benchmark_group("pl-02-parallel-execution");
    group.measurement_time(Duration::from_secs(5));

    let pool = accounts(4_000);
    let batch = random_batch(1_000, &pool, 7);
    let analysis = analysis_service(&pool)
        .analyze(&batch)
        .expect("benchmark batch is acyclic");
    let state: BalanceSheet = pool.iter().map(|a| (a.clone(), 1_000)).collect();

    for workers in [1usize, 0] {
        let config = ExecutionConfig {
            worker_threads: workers,
            atomicity: AtomicityMode::BestEffort,
            ..ExecutionConfig::default()
        };
        let executor =
            ParallelExecutor::new(config, AcceptAllVerifier, ZeroSumConservation, NoQuarantine)
                .expect("worker pool");
        let label = if workers == 1 { "single-worker" } else { "all-cores" };

        group.throughput(Throughput::Elements(batch.len() as u64));
        group.bench_function(label, |b| {
            b.iter(|| {
                black_box(
                    executor
                        .execute(&batch, &analysis, &state, &AbortSignal::new())
                        .map(|run| run.stats.applied),
                )
            })
        });
    }

    group.finish();
}

// ============================================================================
// PL-03: End-to-end commit
// ============================================================================

fn bench_commit_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pl-03-commit-pipeline");
    group.sample_size(20);

    let dir = tempfile::TempDir::new().expect("tempdir");
    let pool = accounts(200);
    let engine = BatchEngine::open(EngineConfig::new(dir.path())).expect("open engine");
    engine
        .seed_accounts(pool.iter().map(|a| (a.clone(), u64::MAX as u128)).collect())
        .expect("seed accounts");

    let mut seed = 0u64;
    group.bench_function("submit-100", |b| {
        b.iter(|| {
            seed += 1;
            black_box(engine.submit(random_batch(100, &pool, seed)).map(|r| r.receipt.batch_seq))
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_dependency_analysis,
    bench_parallel_execution,
    bench_commit_pipeline
);
criterion_main!(benches);
