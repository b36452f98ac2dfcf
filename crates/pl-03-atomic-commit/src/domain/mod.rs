//! Domain layer for Atomic Commit.

pub mod entities;
pub mod errors;
pub mod recovery;

pub use entities::*;
pub use errors::*;
pub use recovery::*;
