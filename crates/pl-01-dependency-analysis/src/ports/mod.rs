//! Ports module for Dependency Analysis
//!
//! Defines inbound (API) and outbound (SPI) port traits.

pub mod inbound;
pub mod outbound;

pub use inbound::DependencyAnalysisApi;
pub use outbound::{AccessAnalyzer, AccountDirectory};
