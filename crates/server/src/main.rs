//! Shelf server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use shelf_core::config::AppConfig;
use shelf_server::{AppState, create_router};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Shelf - a release package server
#[derive(Parser, Debug)]
#[command(name = "shelfd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "SHELF_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Assemble configuration from an optional TOML file plus SHELF_-prefixed
/// environment variables. Env vars win over file values. Refuses to start
/// when neither source provides anything, since the token hash is required.
fn load_config(config_path: &str) -> Result<AppConfig> {
    let mut figment = Figment::new();

    let file_exists = std::path::Path::new(config_path).exists();
    if file_exists {
        tracing::info!(config_path, "loading configuration file");
        figment = figment.merge(Toml::file(config_path));
    }

    // SHELF_CONFIG itself only points at the file, so it does not count as
    // configuration on its own.
    let env_present =
        std::env::vars().any(|(key, _)| key.starts_with("SHELF_") && key != "SHELF_CONFIG");

    if !file_exists && !env_present {
        anyhow::bail!(
            "no configuration found at {config_path} and no SHELF_* environment variables set.\n\
             Either write a config file (see config/server.example.toml) or export\n\
             the settings, e.g.:\n  \
             SHELF_AUTH__TOKEN_HASH=<sha256-hex> SHELF_SERVER__BIND=0.0.0.0:8080 shelfd"
        );
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("SHELF_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    tracing::info!("shelf v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    shelf_server::metrics::register_metrics();

    let store = shelf_storage::from_config(&config.storage)
        .await
        .context("failed to initialize storage")?;

    // Catch an unusable storage directory before accepting any request.
    store
        .health_check()
        .await
        .context("storage health check failed")?;
    tracing::info!(path = %config.storage.path.display(), "package store ready");

    let state = AppState::new(config.clone(), store);
    let app = create_router(state);

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    tracing::info!(%addr, max_packages = config.retention.max_packages, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_requires_some_source() {
        // Point at a path that cannot exist; no SHELF_ env vars are set in
        // the test environment.
        let err = load_config("/nonexistent/shelf/config.toml").unwrap_err();
        assert!(err.to_string().contains("no configuration found"));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        std::fs::write(
            &path,
            "[auth]\n\
             token_hash = \"38d3354f54fb6756e59f735cc2ef6f71e5b4d3f85382190722ca28b328352b3c\"\n\
             [retention]\n\
             max_packages = 4\n",
        )
        .unwrap();

        let config = load_config(path.to_str().unwrap()).unwrap();
        assert_eq!(config.retention.max_packages, 4);
        assert_eq!(config.server.bind, "127.0.0.1:8080");
    }
}
