//! Path cache.
//!
//! Maps `(repository, path)` to the object identity last resolved for it, so
//! conditional requests carrying that entity tag can be answered without
//! touching the repository at all.
//!
//! # Expiry
//!
//! Every entry lives for a fixed TTL counted from insertion; reads do not
//! extend it. An expired entry is a miss immediately, but only the periodic
//! sweep ([`spawn_sweep_task`]) removes it, so memory stays bounded without
//! putting eviction work on the request path.

use crate::metrics;
use dashmap::DashMap;
use docity_core::config::CacheConfig;
use docity_core::{ObjectIdentity, RepoPath};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    repository: String,
    path: RepoPath,
}

impl CacheKey {
    fn new(repository: &str, path: &RepoPath) -> Self {
        Self {
            repository: repository.to_string(),
            path: path.clone(),
        }
    }
}

#[derive(Clone, Debug)]
struct CacheEntry {
    identity: ObjectIdentity,
    expires_at: Instant,
}

struct PathCacheInner {
    entries: DashMap<CacheKey, CacheEntry>,
    ttl: Duration,
}

/// Concurrent TTL cache of path resolutions.
///
/// Cheap to clone; clones share the same entries. A disabled cache misses on
/// every lookup and drops every insert.
#[derive(Clone)]
pub struct PathCache {
    inner: Option<Arc<PathCacheInner>>,
}

impl PathCache {
    pub fn new(config: &CacheConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        Self {
            inner: Some(Arc::new(PathCacheInner {
                entries: DashMap::new(),
                ttl: config.ttl(),
            })),
        }
    }

    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Look up a live entry.
    pub fn get(&self, repository: &str, path: &RepoPath) -> Option<ObjectIdentity> {
        let inner = self.inner.as_ref()?;
        let now = Instant::now();
        let hit = inner
            .entries
            .get(&CacheKey::new(repository, path))
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.identity.clone());

        if hit.is_some() {
            metrics::CACHE_HITS.inc();
        } else {
            metrics::CACHE_MISSES.inc();
        }
        hit
    }

    /// Insert with the configured TTL.
    pub fn put(&self, repository: &str, path: &RepoPath, identity: ObjectIdentity) {
        if let Some(inner) = &self.inner {
            let ttl = inner.ttl;
            self.put_with_ttl(repository, path, identity, ttl);
        }
    }

    /// Insert with an explicit TTL. Replaces any existing entry.
    pub fn put_with_ttl(
        &self,
        repository: &str,
        path: &RepoPath,
        identity: ObjectIdentity,
        ttl: Duration,
    ) {
        let Some(inner) = &self.inner else {
            return;
        };
        inner.entries.insert(
            CacheKey::new(repository, path),
            CacheEntry {
                identity,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Drop the entry for a path that no longer resolves to a file.
    pub fn remove(&self, repository: &str, path: &RepoPath) {
        if let Some(inner) = &self.inner {
            inner.entries.remove(&CacheKey::new(repository, path));
        }
    }

    /// Remove expired entries. Returns the number evicted.
    ///
    /// Keys are collected first and then removed with `remove_if`, so an entry
    /// refreshed between the two steps survives.
    pub fn sweep(&self) -> usize {
        let Some(inner) = &self.inner else {
            return 0;
        };
        let now = Instant::now();

        let expired: Vec<CacheKey> = inner
            .entries
            .iter()
            .filter(|entry| entry.expires_at <= now)
            .map(|entry| entry.key().clone())
            .collect();

        let evicted = expired
            .into_iter()
            .filter(|key| {
                inner
                    .entries
                    .remove_if(key, |_, entry| entry.expires_at <= now)
                    .is_some()
            })
            .count();

        metrics::CACHE_EVICTIONS.inc_by(evicted as u64);
        metrics::CACHE_ENTRIES.set(inner.entries.len() as i64);
        evicted
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.inner.as_ref().map_or(0, |inner| inner.entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Spawn a background task that periodically sweeps expired entries.
///
/// Returns a JoinHandle that can be used to abort the task.
pub fn spawn_sweep_task(cache: PathCache, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let evicted = cache.sweep();
            if evicted > 0 {
                tracing::info!(
                    evicted = evicted,
                    remaining = cache.len(),
                    "Path cache sweep evicted expired entries"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use docity_core::{ContentHash, FileMode, ObjectKind};

    fn identity(path: &str, hash_byte: &str) -> ObjectIdentity {
        ObjectIdentity {
            mode: FileMode::REGULAR,
            kind: ObjectKind::Blob,
            content_hash: ContentHash::from_hex(&hash_byte.repeat(40)).unwrap(),
            size: 2,
            path: RepoPath::parse(path).unwrap(),
        }
    }

    fn config(ttl_secs: u64) -> CacheConfig {
        CacheConfig {
            enabled: true,
            ttl_secs,
            sweep_interval_secs: 3600,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_at_ttl() {
        let cache = PathCache::new(&config(600));
        let path = RepoPath::parse("welcome.html").unwrap();
        cache.put("hello", &path, identity("welcome.html", "a"));

        tokio::time::advance(Duration::from_secs(599)).await;
        assert!(cache.get("hello", &path).is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get("hello", &path).is_none());
        // Still stored until swept
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reads_do_not_extend_lifetime() {
        let cache = PathCache::new(&config(10));
        let path = RepoPath::parse("a.html").unwrap();
        cache.put("r", &path, identity("a.html", "a"));

        for _ in 0..9 {
            tokio::time::advance(Duration::from_secs(1)).await;
            assert!(cache.get("r", &path).is_some());
        }
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get("r", &path).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_only_expired() {
        let cache = PathCache::new(&config(600));
        let old = RepoPath::parse("old.html").unwrap();
        let new = RepoPath::parse("new.html").unwrap();
        cache.put("r", &old, identity("old.html", "a"));
        tokio::time::advance(Duration::from_secs(500)).await;
        cache.put("r", &new, identity("new.html", "b"));
        tokio::time::advance(Duration::from_secs(100)).await;

        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("r", &new).is_some());
    }

    #[tokio::test]
    async fn test_keys_are_per_repository() {
        let cache = PathCache::new(&config(600));
        let path = RepoPath::parse("index.html").unwrap();
        cache.put("one", &path, identity("index.html", "a"));

        assert!(cache.get("one", &path).is_some());
        assert!(cache.get("two", &path).is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_entry() {
        let cache = PathCache::new(&config(600));
        let path = RepoPath::parse("index.html").unwrap();
        cache.put("r", &path, identity("index.html", "a"));
        cache.put("r", &path, identity("index.html", "b"));

        let hit = cache.get("r", &path).unwrap();
        assert_eq!(hit.content_hash.as_str(), "b".repeat(40));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_drops_entry() {
        let cache = PathCache::new(&config(600));
        let path = RepoPath::parse("index.html").unwrap();
        cache.put("r", &path, identity("index.html", "a"));
        cache.put("other", &path, identity("index.html", "a"));

        cache.remove("r", &path);
        assert!(cache.get("r", &path).is_none());
        assert!(cache.get("other", &path).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_cache_never_hits() {
        let cache = PathCache::new(&CacheConfig {
            enabled: false,
            ..Default::default()
        });
        let path = RepoPath::parse("index.html").unwrap();
        cache.put("r", &path, identity("index.html", "a"));

        assert!(!cache.is_enabled());
        assert!(cache.get("r", &path).is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.sweep(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_access() {
        let cache = PathCache::new(&config(600));
        let mut handles = Vec::new();
        for task in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..100 {
                    let path = RepoPath::parse(&format!("p{}.html", i % 10)).unwrap();
                    let byte = if task % 2 == 0 { "a" } else { "b" };
                    cache.put("r", &path, identity(path.as_str(), byte));
                    assert!(cache.get("r", &path).is_some());
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(cache.len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_task_evicts() {
        let cache = PathCache::new(&config(5));
        let path = RepoPath::parse("a.html").unwrap();
        cache.put("r", &path, identity("a.html", "a"));

        let handle = spawn_sweep_task(cache.clone(), Duration::from_secs(10));
        // First tick fires immediately; the second one finds the entry expired
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(cache.is_empty());
        handle.abort();
    }
}
