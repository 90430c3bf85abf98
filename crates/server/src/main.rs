//! docity server binary.

use anyhow::{Context, Result};
use clap::Parser;
use docity_core::config::AppConfig;
use docity_repo::ObjectResolver;
use docity_server::cache::spawn_sweep_task;
use docity_server::{AppState, PackRegistry, create_router};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// docity - serve documentation straight from git repositories
#[derive(Parser, Debug)]
#[command(name = "docityd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "DOCITY_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

/// Load configuration from the optional file plus `DOCITY_` environment variables.
fn load_config(config_path: &str) -> Result<AppConfig> {
    let path = std::path::Path::new(config_path);
    let mut figment = Figment::new();
    let has_config_file = path.exists();

    if has_config_file {
        tracing::info!(config_path = %config_path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::debug!("No config file found at {}", config_path);
    }

    // DOCITY_CONFIG only carries the file path
    let has_env_config =
        std::env::vars().any(|(key, _)| key.starts_with("DOCITY_") && key != "DOCITY_CONFIG");

    if !has_config_file && !has_env_config {
        anyhow::bail!(
            "No configuration provided.\n\n\
             Provide configuration via one of:\n  \
             1. Config file: docityd --config /path/to/config.toml\n  \
             2. Environment variables: DOCITY_REPOS__ROOT=/srv/docs \
             DOCITY_PACKS__HELLO__INDEX_PAGE=index.html docityd\n\n\
             See config/server.example.toml for example configuration.\n\
             Set DOCITY_CONFIG env var to specify a default config file path."
        );
    }

    figment
        .merge(Env::prefixed("DOCITY_").ignore(&["CONFIG"]).split("__"))
        .extract()
        .context("failed to load configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("docity v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;
    match config.validate() {
        Ok(warnings) => {
            for warning in warnings {
                tracing::warn!("Configuration warning: {}", warning);
            }
        }
        Err(error) => anyhow::bail!("invalid configuration: {error}"),
    }

    docity_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    // Fails unless the root is an existing directory
    let backend =
        docity_repo::from_config(&config.repos).context("failed to initialize repository access")?;
    let resolver = ObjectResolver::from_config(backend, &config.repos);
    tracing::info!(
        backend = resolver.backend_name(),
        root = %config.repos.expanded_root().display(),
        treeish = %config.repos.treeish,
        "Repository backend initialized"
    );

    let registry = PackRegistry::load(&config.packs, &resolver).await;
    docity_server::metrics::PACKS_REGISTERED.set(registry.len() as i64);
    docity_server::metrics::PACKS_REJECTED.set(registry.rejected().len() as i64);
    tracing::info!(
        registered = registry.len(),
        rejected = registry.rejected().len(),
        "Document pack registry loaded"
    );
    if registry.is_empty() {
        tracing::warn!("No document packs registered, every view request will return 404");
    }

    let state = AppState::new(config.clone(), registry, resolver);

    if let Some(interval) = state.cache_sweep_interval() {
        spawn_sweep_task(state.cache.clone(), interval);
        tracing::info!(
            ttl_secs = config.cache.ttl_secs,
            interval_secs = interval.as_secs(),
            "Path cache sweep task spawned"
        );
    } else {
        tracing::info!("Path cache disabled");
    }

    let app = create_router(state);

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
