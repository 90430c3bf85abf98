//! Repository backend trait definition.

use crate::error::RepoResult;
use async_trait::async_trait;
use bytes::Bytes;
use docity_core::{ContentHash, ObjectIdentity, RepoPath};

/// Read-only access to the repositories behind document packs.
///
/// `repo_id` names one repository below the backend's root. Paths are
/// resolved against the backend's configured revision.
#[async_trait]
pub trait RepoBackend: Send + Sync + 'static {
    /// Resolve the object recorded at `path`.
    ///
    /// Returns [`RepoError::NotFound`](crate::RepoError::NotFound) when the
    /// path does not exist. Directories resolve to a tree identity.
    async fn locate(&self, repo_id: &str, path: &RepoPath) -> RepoResult<ObjectIdentity>;

    /// Read the full content of the blob with the given hash.
    async fn read_blob(&self, repo_id: &str, hash: &ContentHash) -> RepoResult<Bytes>;

    /// Whether `repo_id` names a usable repository.
    async fn is_valid_repository(&self, repo_id: &str) -> bool;

    /// Get the backend type name.
    fn backend_name(&self) -> &'static str;
}

/// Blob content together with the identity it was read for.
///
/// After symlink following, `identity` is that of the final target.
#[derive(Clone, Debug)]
pub struct Blob {
    pub identity: ObjectIdentity,
    pub content: Bytes,
}
