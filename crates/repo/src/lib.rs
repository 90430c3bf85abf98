//! Repository object access for docity.
//!
//! This crate provides:
//! - The [`RepoBackend`] abstraction: locate an object by path on the branch
//!   tip, read a blob by hash, check repository validity
//! - Backends: embedded git (`git2`) and an in-memory fake for tests
//! - [`ObjectResolver`]: per-call timeouts and bounded symlink following

pub mod backends;
pub mod error;
pub mod resolver;
pub mod traits;

pub use backends::{git::GitBackend, memory::MemoryBackend};
pub use error::{RepoError, RepoResult};
pub use resolver::ObjectResolver;
pub use traits::{Blob, RepoBackend};

use docity_core::config::RepoConfig;
use std::sync::Arc;

/// Create a repository backend from configuration.
pub fn from_config(config: &RepoConfig) -> RepoResult<Arc<dyn RepoBackend>> {
    config.validate().map_err(RepoError::Config)?;
    let backend = GitBackend::new(config.expanded_root(), config.treeish.clone())?;
    Ok(Arc::new(backend))
}
