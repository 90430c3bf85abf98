//! Application state shared across handlers.

use crate::cache::PathCache;
use crate::registry::PackRegistry;
use docity_core::config::AppConfig;
use docity_repo::ObjectResolver;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Registered document packs.
    pub registry: Arc<PackRegistry>,
    /// Path resolution cache.
    pub cache: PathCache,
    /// Object lookup and blob fetching.
    pub resolver: Arc<ObjectResolver>,
}

impl AppState {
    /// Wire the components together. The cache is built from `config.cache`.
    pub fn new(config: AppConfig, registry: PackRegistry, resolver: ObjectResolver) -> Self {
        let cache = PathCache::new(&config.cache);
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            cache,
            resolver: Arc::new(resolver),
        }
    }

    /// Interval for the cache sweep task, or `None` when caching is off.
    ///
    /// A zero interval is rejected by `CacheConfig::validate` before startup.
    pub fn cache_sweep_interval(&self) -> Option<Duration> {
        self.cache
            .is_enabled()
            .then(|| self.config.cache.sweep_interval())
    }
}
