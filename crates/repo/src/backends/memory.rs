//! In-memory repository backend.
//!
//! Holds a flat map of path -> entry per repository; directories are implied
//! by path prefixes. Used by tests across the workspace, so it also supports
//! injected latency and failures and counts the calls it receives.

use crate::error::{RepoError, RepoResult};
use crate::traits::RepoBackend;
use async_trait::async_trait;
use bytes::Bytes;
use docity_core::{ContentHash, FileMode, ObjectIdentity, ObjectKind, RepoPath};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
struct MemoryRepo {
    entries: BTreeMap<String, (FileMode, ContentHash)>,
    objects: HashMap<ContentHash, Bytes>,
}

/// Repositories kept entirely in memory.
#[derive(Default)]
pub struct MemoryBackend {
    repos: RwLock<HashMap<String, MemoryRepo>>,
    failing: RwLock<HashSet<String>>,
    latency: RwLock<Option<Duration>>,
    locate_calls: AtomicUsize,
    read_calls: AtomicUsize,
}

/// Hash of a blob with the given content, git-style framing over SHA-256.
pub fn blob_hash(content: &[u8]) -> RepoResult<ContentHash> {
    let mut hasher = Sha256::new();
    hasher.update(format!("blob {}\0", content.len()).as_bytes());
    hasher.update(content);
    Ok(ContentHash::from_hex(&hex::encode(hasher.finalize()))?)
}

fn tree_hash(repo_id: &str, path: &str) -> RepoResult<ContentHash> {
    let mut hasher = Sha256::new();
    hasher.update(format!("tree {repo_id}\0{path}").as_bytes());
    Ok(ContentHash::from_hex(&hex::encode(hasher.finalize()))?)
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty repository. Existing content is kept.
    pub fn create_repository(&self, repo_id: &str) {
        let mut repos = self.repos.write().unwrap_or_else(|e| e.into_inner());
        repos.entry(repo_id.to_string()).or_default();
    }

    /// Add or replace a regular file, returning its hash.
    pub fn write_file(
        &self,
        repo_id: &str,
        path: &str,
        content: impl Into<Bytes>,
    ) -> RepoResult<ContentHash> {
        self.insert(repo_id, path, FileMode::REGULAR, content.into())
    }

    /// Add or replace a symbolic link pointing at `target`.
    pub fn write_symlink(&self, repo_id: &str, path: &str, target: &str) -> RepoResult<ContentHash> {
        self.insert(
            repo_id,
            path,
            FileMode::SYMLINK,
            Bytes::copy_from_slice(target.as_bytes()),
        )
    }

    /// Remove the entry at `path`. Returns whether it existed.
    pub fn remove(&self, repo_id: &str, path: &str) -> RepoResult<bool> {
        let path = RepoPath::parse(path)?;
        let mut repos = self.repos.write().unwrap_or_else(|e| e.into_inner());
        Ok(repos
            .get_mut(repo_id)
            .is_some_and(|repo| repo.entries.remove(path.as_str()).is_some()))
    }

    /// Drop blob content while leaving tree entries pointing at it.
    pub fn remove_object(&self, repo_id: &str, hash: &ContentHash) -> bool {
        let mut repos = self.repos.write().unwrap_or_else(|e| e.into_inner());
        repos
            .get_mut(repo_id)
            .is_some_and(|repo| repo.objects.remove(hash).is_some())
    }

    /// Make every call for `repo_id` fail with an upstream error.
    pub fn set_failing(&self, repo_id: &str, failing: bool) {
        let mut set = self.failing.write().unwrap_or_else(|e| e.into_inner());
        if failing {
            set.insert(repo_id.to_string());
        } else {
            set.remove(repo_id);
        }
    }

    /// Delay every locate and read by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write().unwrap_or_else(|e| e.into_inner()) = latency;
    }

    pub fn locate_calls(&self) -> usize {
        self.locate_calls.load(Ordering::SeqCst)
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    fn insert(
        &self,
        repo_id: &str,
        path: &str,
        mode: FileMode,
        content: Bytes,
    ) -> RepoResult<ContentHash> {
        let path = RepoPath::parse(path)?;
        let hash = blob_hash(&content)?;
        let mut repos = self.repos.write().unwrap_or_else(|e| e.into_inner());
        let repo = repos.entry(repo_id.to_string()).or_default();
        repo.entries
            .insert(path.as_str().to_string(), (mode, hash.clone()));
        repo.objects.insert(hash.clone(), content);
        Ok(hash)
    }

    async fn before_call(&self, repo_id: &str) -> RepoResult<()> {
        let latency = *self.latency.read().unwrap_or_else(|e| e.into_inner());
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let failing = self
            .failing
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(repo_id);
        if failing {
            return Err(RepoError::Upstream(format!(
                "injected failure for {repo_id}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RepoBackend for MemoryBackend {
    async fn locate(&self, repo_id: &str, path: &RepoPath) -> RepoResult<ObjectIdentity> {
        self.locate_calls.fetch_add(1, Ordering::SeqCst);
        self.before_call(repo_id).await?;

        let repos = self.repos.read().unwrap_or_else(|e| e.into_inner());
        let repo = repos
            .get(repo_id)
            .ok_or_else(|| RepoError::RepositoryNotFound(repo_id.to_string()))?;

        if let Some((mode, hash)) = repo.entries.get(path.as_str()) {
            let size = repo.objects.get(hash).map_or(0, |b| b.len() as u64);
            return Ok(ObjectIdentity {
                mode: *mode,
                kind: ObjectKind::Blob,
                content_hash: hash.clone(),
                size,
                path: path.clone(),
            });
        }

        let prefix = format!("{}/", path.as_str());
        let is_dir = repo
            .entries
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(key, _)| key.starts_with(&prefix));
        if is_dir {
            return Ok(ObjectIdentity {
                mode: FileMode::TREE,
                kind: ObjectKind::Tree,
                content_hash: tree_hash(repo_id, path.as_str())?,
                size: 0,
                path: path.clone(),
            });
        }

        Err(RepoError::NotFound(path.to_string()))
    }

    async fn read_blob(&self, repo_id: &str, hash: &ContentHash) -> RepoResult<Bytes> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        self.before_call(repo_id).await?;

        let repos = self.repos.read().unwrap_or_else(|e| e.into_inner());
        repos
            .get(repo_id)
            .ok_or_else(|| RepoError::RepositoryNotFound(repo_id.to_string()))?
            .objects
            .get(hash)
            .cloned()
            .ok_or_else(|| RepoError::NotFound(hash.to_string()))
    }

    async fn is_valid_repository(&self, repo_id: &str) -> bool {
        self.repos
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(repo_id)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
