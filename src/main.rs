use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use music_api::cache::MemoryCache;
use music_api::config::Config;
use music_api::library::SqliteTrackRepository;
use music_api::playlist::SqlitePlaylistRepository;
use music_api::server::{self, AppState};
use music_api::service::{PlaylistService, TrackService};
use music_api::storage::AudioStore;

fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("Invalid log level")?;

    let file_layer = match &config.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(file_layer)
        .init();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_tracing(&config)?;

    tracing::info!("Starting Music API");
    tracing::info!("Database: {}", config.database.display());
    tracing::info!("Audio directory: {}", config.audio_dir.display());

    let pool = music_api::db::connect(&config.database)
        .await
        .context("Failed to open database")?;
    let store = AudioStore::new(&config.audio_dir);

    let mut tracks = TrackService::new(Arc::new(SqliteTrackRepository::new(pool.clone())), store);
    let mut playlists = PlaylistService::new(Arc::new(SqlitePlaylistRepository::new(pool)));

    if config.cache {
        tracing::info!("Record cache enabled, ttl {}s", config.cache_ttl_secs);
        let cache = Arc::new(MemoryCache::new(config.cache_ttl()));
        tracks = tracks.with_cache(cache.clone());
        playlists = playlists.with_cache(cache);
    }

    let app = server::create_router(AppState { tracks, playlists }, config.max_upload_bytes());
    let addr = config.bind_addr();

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  GET|POST        /v1/track");
    tracing::info!("  GET|PUT|DELETE  /v1/track/:id");
    tracing::info!("  GET             /v1/track/:id/download");
    tracing::info!("  GET|POST        /v1/playlist");
    tracing::info!("  GET|PUT|DELETE  /v1/playlist/:id");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}
