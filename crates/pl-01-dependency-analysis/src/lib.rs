//! # PL-01: Dependency Analysis Subsystem
//!
//! Turns an unordered batch of transactions into a canonical, wave-partitioned
//! schedule. Three stages run in order:
//!
//! 1. **Dependency Analyzer**: derives conservative read/write sets and builds
//!    the must-happen-before graph in submission order.
//! 2. **Conflict Detector**: exhaustively classifies every conflicting pair
//!    (RAW / WAW / WAR) and rejects cyclic graphs, naming the cycle.
//! 3. **Conflict Resolver**: layers the acyclic graph into waves; ties are
//!    broken by transaction id so the output is a pure function of the batch.
//!
//! ## Architecture
//!
//! - **Domain**: Core entities (AnnotatedTransaction, DependencyGraph, ResolvedSchedule)
//! - **Algorithms**: graph building, conflict classification, cycle search, wave layering
//! - **Ports**: Inbound (DependencyAnalysisApi) and Outbound (AccessAnalyzer, AccountDirectory)
//! - **Adapters**: Conservative access analyzer, in-memory account directory
//! - **Application**: Service orchestration

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use adapters::{ConservativeAccessAnalyzer, InMemoryAccountDirectory};
pub use algorithms::{find_cycle, resolve_waves, ConflictReport};
pub use application::service::{AnalysisOutcome, DependencyAnalysisService};
pub use config::AnalysisConfig;
pub use domain::entities::*;
pub use domain::errors::{AnalysisError, MalformedReason};
pub use domain::value_objects::*;
pub use ports::inbound::DependencyAnalysisApi;
pub use ports::outbound::{AccessAnalyzer, AccountDirectory};
