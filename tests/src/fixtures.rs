//! Shared fixtures for the integration and property tests.

use parking_lot::Mutex;
use pl_01_dependency_analysis::{
    AccessAnalyzer, AccessSet, AnalysisConfig, AnalysisError, DependencyAnalysisService,
    InMemoryAccountDirectory,
};
use pl_02_parallel_execution::{
    ConservationChecker, ConservationViolation, VerificationRejection, Verifier,
};
use pl_runtime::{BatchEngine, EngineConfig};
use shared_types::{AccountDelta, AccountId, Balance, Operation, Transaction, TxId};
use std::collections::BTreeSet;
use std::sync::Arc;
use tempfile::TempDir;

pub fn account(name: &str) -> AccountId {
    AccountId::from(name)
}

/// `acct-00` .. `acct-{n-1}`
pub fn account_pool(n: usize) -> Vec<AccountId> {
    (0..n).map(|i| AccountId::new(format!("acct-{i:02}"))).collect()
}

/// Transaction with exactly the given declared sets and an opaque body.
pub fn declared(id: u64, reads: &[&AccountId], writes: &[&AccountId]) -> Transaction {
    Transaction::new(id, Operation::Opaque(id.to_be_bytes().to_vec()))
        .with_reads(reads.iter().map(|a| (*a).clone()).collect())
        .with_writes(writes.iter().map(|a| (*a).clone()).collect())
}

/// Trusts declared read/write sets verbatim, for tests about conflict
/// classification rather than widening.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclaredAccess;

impl AccessAnalyzer for DeclaredAccess {
    fn analyze(&self, tx: &Transaction) -> Result<AccessSet, AnalysisError> {
        Ok(AccessSet::new()
            .with_reads(tx.reads.iter().cloned())
            .with_writes(tx.writes.iter().cloned()))
    }
}

/// Analysis service over declared sets with no account-existence check.
pub fn declared_analysis() -> DependencyAnalysisService<DeclaredAccess, InMemoryAccountDirectory> {
    let config = AnalysisConfig {
        require_known_accounts: false,
        ..AnalysisConfig::default()
    };
    DependencyAnalysisService::new(config, DeclaredAccess, Arc::new(InMemoryAccountDirectory::default()))
}

/// Verifier rejecting a fixed set of transactions.
#[derive(Debug, Default)]
pub struct RejectingVerifier {
    rejected: Mutex<BTreeSet<TxId>>,
}

impl RejectingVerifier {
    pub fn new(rejected: impl IntoIterator<Item = TxId>) -> Self {
        Self {
            rejected: Mutex::new(rejected.into_iter().collect()),
        }
    }
}

impl Verifier for RejectingVerifier {
    fn verify(&self, tx: &Transaction) -> Result<(), VerificationRejection> {
        if self.rejected.lock().contains(&tx.id) {
            return Err(VerificationRejection::new(format!("{} failed its proof", tx.id)));
        }
        Ok(())
    }
}

/// Conservation check that refuses any single delta above a limit.
#[derive(Debug, Clone, Copy)]
pub struct CappedConservation(pub i128);

impl ConservationChecker for CappedConservation {
    fn check_conservation(&self, deltas: &[AccountDelta]) -> Result<(), ConservationViolation> {
        match deltas.iter().find(|d| d.amount.abs() > self.0) {
            Some(delta) => Err(ConservationViolation::new(format!(
                "{} moves {}",
                delta.account, delta.amount
            ))),
            None => Ok(()),
        }
    }
}

pub fn engine_config(dir: &TempDir) -> EngineConfig {
    EngineConfig::new(dir.path())
}

/// Default engine with `balances` opened.
pub fn seeded_engine(dir: &TempDir, balances: &[(&str, Balance)]) -> BatchEngine {
    let engine = BatchEngine::open(engine_config(dir)).expect("open engine");
    engine
        .seed_accounts(balances.iter().map(|(name, b)| (account(name), *b)).collect())
        .expect("seed accounts");
    engine
}
