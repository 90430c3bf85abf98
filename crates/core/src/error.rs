//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid pack name: {0}")]
    InvalidPackName(String),

    #[error("invalid hash: {0}")]
    InvalidHash(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
