//! Object resolution on top of a [`RepoBackend`].

use crate::error::{RepoError, RepoResult};
use crate::traits::{Blob, RepoBackend};
use docity_core::config::RepoConfig;
use docity_core::{ObjectIdentity, RepoPath};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Locates objects and fetches blob content, bounding every backend call by
/// a timeout and following symbolic links up to a fixed depth.
#[derive(Clone)]
pub struct ObjectResolver {
    backend: Arc<dyn RepoBackend>,
    call_timeout: Duration,
    max_symlink_depth: u32,
}

impl ObjectResolver {
    pub fn new(backend: Arc<dyn RepoBackend>, call_timeout: Duration, max_symlink_depth: u32) -> Self {
        Self {
            backend,
            call_timeout,
            max_symlink_depth,
        }
    }

    pub fn from_config(backend: Arc<dyn RepoBackend>, config: &RepoConfig) -> Self {
        Self::new(backend, config.call_timeout(), config.max_symlink_depth)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    pub fn max_symlink_depth(&self) -> u32 {
        self.max_symlink_depth
    }

    /// Resolve `path` to the identity recorded on the branch tip.
    pub async fn locate(&self, repo_id: &str, path: &RepoPath) -> RepoResult<ObjectIdentity> {
        self.timed(self.backend.locate(repo_id, path)).await
    }

    /// Fetch the content behind `identity`.
    ///
    /// A symbolic link is resolved relative to its own directory and the
    /// target located afresh; at most `max_symlink_depth` links are followed.
    /// The returned identity is the final non-link target.
    pub async fn fetch(&self, repo_id: &str, identity: &ObjectIdentity) -> RepoResult<Blob> {
        let mut current = identity.clone();
        let mut followed = 0;

        loop {
            if !current.is_blob() {
                return Err(RepoError::NotFound(format!(
                    "{} is a {}, not a file",
                    current.path, current.kind
                )));
            }

            let content = self
                .timed(self.backend.read_blob(repo_id, &current.content_hash))
                .await?;
            if !current.is_symlink() {
                return Ok(Blob {
                    identity: current,
                    content,
                });
            }

            if followed == self.max_symlink_depth {
                return Err(RepoError::SymlinkDepthExceeded {
                    path: identity.path.to_string(),
                    max: self.max_symlink_depth,
                });
            }
            followed += 1;

            let target = std::str::from_utf8(&content).map_err(|_| {
                RepoError::InvalidLink(format!("{}: target is not UTF-8", current.path))
            })?;
            let next = current
                .path
                .resolve_link(target.trim_end_matches('\n'))
                .map_err(|e| RepoError::InvalidLink(format!("{}: {e}", current.path)))?;
            debug!(link = %current.path, target = %next, depth = followed, "following symlink");
            current = self.locate(repo_id, &next).await?;
        }
    }

    /// Whether `repo_id` names a usable repository. A timeout counts as no.
    pub async fn is_valid_repository(&self, repo_id: &str) -> bool {
        tokio::time::timeout(self.call_timeout, self.backend.is_valid_repository(repo_id))
            .await
            .unwrap_or(false)
    }

    async fn timed<T>(&self, call: impl Future<Output = RepoResult<T>>) -> RepoResult<T> {
        tokio::time::timeout(self.call_timeout, call)
            .await
            .map_err(|_| RepoError::Timeout(self.call_timeout))?
    }
}
