//! `gm2-search serve` — run the listing refresh endpoint.

use crate::config::{default_config_path, PluginConfig};
use crate::endpoint::refresh::{router, EndpointState, REFRESH_PATH};
use crate::host::context::AmbientLoop;
use crate::host::hooks::ExtensionPoints;
use crate::store::sqlite::SqliteCatalog;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Run the serve command.
pub async fn run(config_path: Option<PathBuf>, bind: Option<String>) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gm2_search=info".parse().unwrap()),
        )
        .init();

    info!("starting gm2-search v{}", env!("CARGO_PKG_VERSION"));

    let config_file = config_path.unwrap_or_else(default_config_path);
    let mut config = PluginConfig::load_or_default(&config_file)?;
    if let Some(bind) = bind {
        config.bind = bind;
    }

    let store = match config.database.clone() {
        Some(path) => SqliteCatalog::open(&path, config.clone())?,
        None => SqliteCatalog::open_in_memory(config.clone())?,
    };
    store.seed_demo().context("failed to seed demo catalog")?;

    let state = EndpointState {
        host: Arc::new(store),
        hooks: Arc::new(ExtensionPoints::new()),
        ambient: Arc::new(AmbientLoop::new()),
    };

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    eprintln!(
        "  gm2-search v{} serving {REFRESH_PATH} on http://{}",
        env!("CARGO_PKG_VERSION"),
        config.bind
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("received shutdown signal");
        })
        .await
        .context("server error")
}
