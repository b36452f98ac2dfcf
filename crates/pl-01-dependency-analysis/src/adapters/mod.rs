//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements outbound port traits.

mod access_analyzer;
mod account_directory;

pub use access_analyzer::ConservativeAccessAnalyzer;
pub use account_directory::InMemoryAccountDirectory;
