//! # Integration Tests
//!
//! Batches driven through `BatchEngine`, from analysis to durable commit.

mod atomicity;
mod crash_safety;
mod pipeline;
