//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// HTTP server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:9899").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
    /// `max-age` advertised in the Cache-Control header of served content.
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

fn default_bind() -> String {
    "127.0.0.1:9899".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_max_age_secs() -> u64 {
    86400 // 1 day
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            metrics_enabled: default_metrics_enabled(),
            max_age_secs: default_max_age_secs(),
        }
    }
}

impl ServerConfig {
    /// The Cache-Control value for served content.
    pub fn cache_control(&self) -> String {
        format!("private, max-age={}", self.max_age_secs)
    }
}

/// Repository access configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Directory holding one repository per document pack.
    /// A leading `$HOME` or `~` is expanded.
    #[serde(default = "default_repos_root")]
    pub root: PathBuf,
    /// Revision that paths are resolved against.
    #[serde(default = "default_treeish")]
    pub treeish: String,
    /// Upper bound for a single repository call, in milliseconds.
    /// A call that exceeds it fails the request with 404.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    /// Maximum number of symbolic links followed while fetching one blob.
    #[serde(default = "default_max_symlink_depth")]
    pub max_symlink_depth: u32,
}

fn default_repos_root() -> PathBuf {
    PathBuf::from("$HOME/.gitdocity")
}

fn default_treeish() -> String {
    "HEAD".to_string()
}

fn default_call_timeout_ms() -> u64 {
    5000
}

fn default_max_symlink_depth() -> u32 {
    8
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            root: default_repos_root(),
            treeish: default_treeish(),
            call_timeout_ms: default_call_timeout_ms(),
            max_symlink_depth: default_max_symlink_depth(),
        }
    }
}

impl RepoConfig {
    /// Get the call timeout as a Duration.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// The repository root with `$HOME` / `~` expanded.
    pub fn expanded_root(&self) -> PathBuf {
        expand_home(&self.root)
    }

    /// Validate repository configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.call_timeout_ms == 0 {
            return Err("repos.call_timeout_ms cannot be 0".to_string());
        }
        if self.max_symlink_depth == 0 {
            return Err("repos.max_symlink_depth cannot be 0".to_string());
        }
        if self.treeish.trim().is_empty() {
            return Err("repos.treeish cannot be empty".to_string());
        }
        let root = self.expanded_root();
        if !root.is_absolute() {
            return Err(format!(
                "repos.root \"{}\" is not an absolute path",
                root.display()
            ));
        }
        Ok(())
    }
}

fn expand_home(path: &Path) -> PathBuf {
    let Some(raw) = path.to_str() else {
        return path.to_path_buf();
    };
    let rest = raw
        .strip_prefix("$HOME")
        .or_else(|| raw.strip_prefix("${HOME}"))
        .or_else(|| raw.strip_prefix('~'));
    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with('/') => {
            home.join(rest.trim_start_matches('/'))
        }
        _ => path.to_path_buf(),
    }
}

/// Path cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable the path cache. Disabling it only changes latency.
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Lifetime of a cached path resolution, counted from insertion.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
    /// Interval between sweeps that evict expired entries.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_ttl_secs() -> u64 {
    600 // 10 minutes
}

fn default_sweep_interval_secs() -> u64 {
    3600 // 1 hour
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_secs: default_cache_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Validate cache configuration.
    /// Returns warnings for settings that are allowed but unusual.
    pub fn validate(&self) -> Result<Vec<String>, String> {
        let mut warnings = Vec::new();

        if !self.enabled {
            return Ok(warnings);
        }

        // tokio::time::interval panics on a zero period
        if self.sweep_interval_secs == 0 {
            return Err("cache.sweep_interval_secs cannot be 0".to_string());
        }
        if self.ttl_secs == 0 {
            return Err(
                "cache.ttl_secs cannot be 0; set cache.enabled = false to turn caching off"
                    .to_string(),
            );
        }

        if self.sweep_interval_secs < self.ttl_secs {
            warnings.push(format!(
                "cache.sweep_interval_secs={} is shorter than cache.ttl_secs={}; \
                 sweeps will mostly find nothing to evict",
                self.sweep_interval_secs, self.ttl_secs
            ));
        }

        Ok(warnings)
    }
}

/// One `[packs.<name>]` table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PackConfig {
    /// Page served for the pack root.
    #[serde(default)]
    pub index_page: String,
    /// Display text for the pack listing.
    #[serde(default)]
    pub description: Option<String>,
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub repos: RepoConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    /// Document packs keyed by name.
    #[serde(default)]
    pub packs: BTreeMap<String, PackConfig>,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** No packs, short repository timeout.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            repos: RepoConfig {
                root: std::env::temp_dir(),
                call_timeout_ms: 1000,
                ..RepoConfig::default()
            },
            cache: CacheConfig::default(),
            packs: BTreeMap::new(),
        }
    }

    /// Validate the whole configuration, returning warnings on success.
    pub fn validate(&self) -> Result<Vec<String>, String> {
        self.repos.validate()?;
        let mut warnings = self.cache.validate()?;
        if self.packs.is_empty() {
            warnings.push("no document packs configured".to_string());
        }
        Ok(warnings)
    }
}
