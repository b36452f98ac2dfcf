//! Application layer: executor orchestration.

pub mod service;

pub use service::ParallelExecutor;
