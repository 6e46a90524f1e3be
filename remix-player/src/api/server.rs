//! HTTP server setup and routing
//!
//! Sets up the Axum HTTP server with control endpoints and SSE.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use sqlx::{Pool, Sqlite};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::library::Library;
use crate::playback::{PreviewPlayer, Sequencer};
use crate::state::SharedState;

/// Shared application context passed to all handlers
///
/// AppContext implements Clone, which gives us `FromRef<AppContext>`
/// via Axum's blanket implementation.
#[derive(Clone)]
pub struct AppContext {
    pub state: Arc<SharedState>,
    pub sequencer: Arc<Sequencer>,
    pub preview: Arc<PreviewPlayer>,
    pub library: Arc<Library>,
    pub db_pool: Pool<Sqlite>,
    pub port: u16,
}

/// Build the full API router
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(super::handlers::health))
        // Playback control
        .route("/playback/play", post(super::handlers::play))
        .route("/playback/pause", post(super::handlers::pause))
        .route("/playback/resume", post(super::handlers::resume))
        .route("/playback/stop", post(super::handlers::stop))
        .route("/playback/seek", post(super::handlers::seek))
        .route("/playback/skip", post(super::handlers::skip))
        .route("/playback/state", get(super::handlers::get_playback_state))
        // Volume
        .route("/audio/volume", get(super::handlers::get_volume))
        .route("/audio/volume", post(super::handlers::set_volume))
        // Section preview
        .route("/preview/start", post(super::handlers::start_preview))
        .route("/preview/stop", post(super::handlers::stop_preview))
        // Song library
        .route("/songs", get(super::handlers::list_songs))
        .route("/songs/:song_id", get(super::handlers::get_song))
        .route("/songs/upload", post(super::handlers::upload_songs))
        // Stored mixes
        .route("/mixes", get(super::handlers::list_mixes))
        .route("/mixes", post(super::handlers::save_mix))
        .route("/mixes/import", post(super::handlers::import_mix))
        .route("/mixes/:mix_id", get(super::handlers::get_mix))
        .route("/mixes/:mix_id", delete(super::handlers::delete_mix))
        .route("/mixes/:mix_id/export", get(super::handlers::export_mix))
        // SSE event stream
        .route("/events", get(super::sse::event_stream))
        .with_state(ctx)
        // Enable CORS for local access
        .layer(CorsLayer::permissive())
}

/// Run the HTTP API server until shutdown
pub async fn run(config: &Config, ctx: AppContext) -> Result<()> {
    let app = create_router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
