//! Embedded git backend.
//!
//! Each document pack is a bare (or non-bare) repository directly below the
//! configured root. All git2 calls run on the blocking pool.

use crate::error::{RepoError, RepoResult};
use crate::traits::RepoBackend;
use async_trait::async_trait;
use bytes::Bytes;
use docity_core::{ContentHash, FileMode, ObjectIdentity, ObjectKind, PackName, RepoPath};
use git2::{ObjectType, Oid, Repository};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Git repositories on the local filesystem.
pub struct GitBackend {
    root: PathBuf,
    treeish: String,
}

impl GitBackend {
    /// Create a backend serving repositories below `root`.
    pub fn new(root: impl AsRef<Path>, treeish: impl Into<String>) -> RepoResult<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(RepoError::Config(format!(
                "repository root {} is not a directory",
                root.display()
            )));
        }
        Ok(Self {
            root,
            treeish: treeish.into(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn repo_dir(&self, repo_id: &str) -> RepoResult<PathBuf> {
        // Same rule as pack names: one plain path component.
        let name = PackName::new(repo_id)
            .map_err(|_| RepoError::RepositoryNotFound(repo_id.to_string()))?;
        Ok(self.root.join(name.as_str()))
    }
}

async fn blocking<T, F>(f: F) -> RepoResult<T>
where
    F: FnOnce() -> RepoResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| RepoError::Upstream(format!("spawn_blocking failed: {e}")))?
}

fn open(dir: &Path, repo_id: &str) -> RepoResult<Repository> {
    Repository::open(dir).map_err(|e| match e.code() {
        git2::ErrorCode::NotFound => RepoError::RepositoryNotFound(repo_id.to_string()),
        _ => RepoError::Upstream(format!("open {repo_id}: {}", e.message())),
    })
}

fn object_kind(kind: Option<ObjectType>) -> ObjectKind {
    match kind {
        Some(ObjectType::Blob) => ObjectKind::Blob,
        Some(ObjectType::Tree) => ObjectKind::Tree,
        Some(ObjectType::Commit) => ObjectKind::Commit,
        _ => ObjectKind::Other,
    }
}

fn locate_sync(
    dir: &Path,
    repo_id: &str,
    treeish: &str,
    path: &RepoPath,
) -> RepoResult<ObjectIdentity> {
    let repo = open(dir, repo_id)?;
    let tree = repo
        .revparse_single(treeish)
        .and_then(|object| object.peel_to_tree())
        .map_err(|e| RepoError::from_git2(e, &format!("{repo_id}@{treeish}")))?;
    let entry = tree
        .get_path(Path::new(path.as_str()))
        .map_err(|e| RepoError::from_git2(e, path.as_str()))?;

    let kind = object_kind(entry.kind());
    let size = if kind == ObjectKind::Blob {
        let odb = repo
            .odb()
            .map_err(|e| RepoError::from_git2(e, "object database"))?;
        let (size, _) = odb
            .read_header(entry.id())
            .map_err(|e| RepoError::from_git2(e, path.as_str()))?;
        size as u64
    } else {
        0
    };

    Ok(ObjectIdentity {
        mode: FileMode::from_bits(entry.filemode() as u32),
        kind,
        content_hash: ContentHash::from_hex(&entry.id().to_string())?,
        size,
        path: path.clone(),
    })
}

fn read_blob_sync(dir: &Path, repo_id: &str, hash: &ContentHash) -> RepoResult<Bytes> {
    let repo = open(dir, repo_id)?;
    let oid = Oid::from_str(hash.as_str())
        .map_err(|e| RepoError::Upstream(format!("bad object id {hash}: {}", e.message())))?;
    let blob = repo
        .find_blob(oid)
        .map_err(|e| RepoError::from_git2(e, hash.as_str()))?;
    Ok(Bytes::copy_from_slice(blob.content()))
}

#[async_trait]
impl RepoBackend for GitBackend {
    #[instrument(skip(self, path), fields(path = %path))]
    async fn locate(&self, repo_id: &str, path: &RepoPath) -> RepoResult<ObjectIdentity> {
        let dir = self.repo_dir(repo_id)?;
        let repo_id = repo_id.to_string();
        let treeish = self.treeish.clone();
        let path = path.clone();
        let identity =
            blocking(move || locate_sync(&dir, &repo_id, &treeish, &path)).await?;
        debug!(hash = %identity.content_hash, mode = %identity.mode, "located object");
        Ok(identity)
    }

    #[instrument(skip(self, hash), fields(hash = %hash))]
    async fn read_blob(&self, repo_id: &str, hash: &ContentHash) -> RepoResult<Bytes> {
        let dir = self.repo_dir(repo_id)?;
        let repo_id = repo_id.to_string();
        let hash = hash.clone();
        blocking(move || read_blob_sync(&dir, &repo_id, &hash)).await
    }

    async fn is_valid_repository(&self, repo_id: &str) -> bool {
        let Ok(dir) = self.repo_dir(repo_id) else {
            return false;
        };
        blocking(move || Ok(Repository::open(&dir).is_ok()))
            .await
            .unwrap_or(false)
    }

    fn backend_name(&self) -> &'static str {
        "git"
    }
}
