//! Photo Frame - serves a Synology Photos album from memory
//!
//! A background task keeps the album listing in sync and pre-downloads new
//! photos; HTTP handlers serve photos from the cache, downloading on miss.

use clap::Parser;
use photo_cache::PhotoCache;
use photo_frame::{
    run_sync_loop, start_server, Cli, Config, PhotoSource, Result, ServerState, SharedState,
    SynologySource,
};
use std::sync::Arc;
use synology_photos_client::SynologyPhotosClient;
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env().add_directive("photo_frame=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting Photo Frame...");

    let config = Config::from_cli(Cli::parse())?;
    info!("NAS: {}", config.base_url);
    info!("Album: {}", config.album);
    info!(
        "Max cache size: {} MB",
        config.max_cache_bytes / (1024 * 1024)
    );
    info!("Sync interval: {:?}", config.sync_interval);
    if !config.verify_tls {
        warn!("TLS certificate verification disabled");
    }

    let cache = Arc::new(PhotoCache::new(config.max_cache_bytes));

    let client = SynologyPhotosClient::with_options(
        &config.base_url,
        &config.username,
        &config.password,
        config.verify_tls,
    );
    let synology = Arc::new(SynologySource::new(client, config.album.clone()));
    let source: Arc<dyn PhotoSource> = synology.clone();

    // Background album sync
    let sync = tokio::spawn(run_sync_loop(
        Arc::clone(&cache),
        Arc::clone(&source),
        config.sync_interval,
        config.min_items,
    ));

    let state: SharedState = Arc::new(ServerState::new(cache, source));

    // Start HTTP server (blocking until Ctrl-C)
    start_server(state, config.server_port, shutdown_signal()).await?;

    sync.abort();
    if let Err(e) = synology.client().logout().await {
        warn!(error = %e, "Failed to log out of Synology Photos");
    }
    info!("Photo Frame stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
