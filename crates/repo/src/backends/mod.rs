//! Repository backend implementations.

pub mod git;
pub mod memory;
