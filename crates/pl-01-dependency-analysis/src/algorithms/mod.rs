//! Algorithms module for Dependency Analysis
//!
//! Contains:
//! - Dependency graph builder
//! - Exhaustive conflict detector
//! - Deterministic cycle search
//! - Kahn wave layering

pub mod conflict_detector;
pub mod cycle_detector;
pub mod dependency_builder;
pub mod wave_resolver;

pub use conflict_detector::{detect_conflicts, ensure_acyclic, ConflictReport};
pub use cycle_detector::find_cycle;
pub use dependency_builder::build_dependency_graph;
pub use wave_resolver::resolve_waves;
