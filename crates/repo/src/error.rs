//! Repository error types.

use std::time::Duration;
use thiserror::Error;

/// Repository access errors.
///
/// Clients only ever see "not found" for any of these, but the variants are
/// kept apart so logs and metrics can tell an absent path from a failing
/// repository.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("repository error: {0}")]
    Upstream(String),

    #[error("repository call timed out after {0:?}")]
    Timeout(Duration),

    #[error("symlink chain at {path} exceeds {max} links")]
    SymlinkDepthExceeded { path: String, max: u32 },

    #[error("invalid symlink target: {0}")]
    InvalidLink(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("core error: {0}")]
    Core(#[from] docity_core::Error),
}

impl RepoError {
    /// Whether the error means the requested object is simply absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::RepositoryNotFound(_) => "repository_not_found",
            Self::Upstream(_) | Self::Core(_) => "upstream",
            Self::Timeout(_) => "timeout",
            Self::SymlinkDepthExceeded { .. } => "symlink_depth",
            Self::InvalidLink(_) => "invalid_link",
            Self::Config(_) => "config",
        }
    }

    pub(crate) fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound | git2::ErrorCode::UnbornBranch => {
                Self::NotFound(context.to_string())
            }
            _ => Self::Upstream(format!("{context}: {}", err.message())),
        }
    }
}

/// Result type for repository operations.
pub type RepoResult<T> = std::result::Result<T, RepoError>;
