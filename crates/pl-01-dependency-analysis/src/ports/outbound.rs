//! Outbound Ports (Driven Ports / SPI)

use crate::domain::errors::AnalysisError;
use crate::domain::value_objects::AccessSet;
use shared_types::{AccountId, Transaction};

/// Derives the effective read/write sets of a transaction.
pub trait AccessAnalyzer: Send + Sync {
    /// Analyze a transaction to determine its access set.
    ///
    /// Implementations must be conservative: when reads cannot be separated
    /// from writes, the account belongs to both sets.
    fn analyze(&self, tx: &Transaction) -> Result<AccessSet, AnalysisError>;
}

/// Answers whether an account exists in the ledger.
pub trait AccountDirectory: Send + Sync {
    fn contains(&self, account: &AccountId) -> bool;
}
