//! Ports layer for Atomic Commit.

pub mod inbound;
pub mod outbound;
