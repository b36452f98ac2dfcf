//! Crash points for recovery tests.
//!
//! Arming a point makes the next commit (or, for `MidRollback`, the next
//! recovery) stop there as if the process died: nothing after it is written
//! and the manager must be dropped and reopened.

/// Where the next commit stops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrashPoint {
    /// Every record logged, nothing applied
    AfterLogging,
    /// `applied` mutations written and flagged, the rest not
    MidApply { applied: usize },
    /// Every mutation applied and flagged, root not yet persisted
    BeforeRootPersist,
    /// Recovery has rolled back `rolled_back` records, newest first
    MidRollback { rolled_back: usize },
}
