//! Remix Player - Main entry point
//!
//! Backend service for section-based music mixing: holds the song
//! library, derives song structure via the analysis backend, stores
//! mixes, and plays mixes and previews through the sequencer.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use remix_player::analysis::{AnalysisClient, EnergyHeuristicPolicy};
use remix_player::api::{self, AppContext};
use remix_player::config::Config;
use remix_player::db;
use remix_player::library::Library;
use remix_player::playback::{PreviewPlayer, Sequencer, SimulatedMedia, TrackCatalog};
use remix_player::state::SharedState;

/// Command-line arguments for remix-player
#[derive(Parser, Debug)]
#[command(name = "remix-player")]
#[command(about = "Section-based music mixing service")]
#[command(version)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "remix-player.toml", env = "REMIX_CONFIG")]
    config: PathBuf,

    /// Port to listen on (overrides configuration)
    #[arg(short, long, env = "REMIX_PORT")]
    port: Option<u16>,

    /// SQLite database path (overrides configuration)
    #[arg(short, long, env = "REMIX_DATABASE")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "remix_player=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = Config::load(&args.config).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(database) = args.database {
        config.database_path = database;
    }

    info!("Starting Remix Player on port {}", config.port);

    // Database and persisted settings
    let db_pool = db::init::connect(&config.database_path)
        .await
        .context("Failed to open database")?;
    db::init::init_schema(&db_pool)
        .await
        .context("Failed to initialize database schema")?;
    let volume = db::storage::get_volume(&db_pool)
        .await
        .context("Failed to load persisted volume")?;

    // Shared state and media resources; mix playback and preview get
    // independent outputs so neither interrupts the other
    let state = Arc::new(SharedState::new());
    state.set_volume(volume).await;

    let catalog = TrackCatalog::new();
    let deck = Arc::new(SimulatedMedia::new(catalog.clone()));
    let preview_deck = Arc::new(SimulatedMedia::new(catalog.clone()));

    let sequencer = Arc::new(Sequencer::new(Arc::clone(&state), deck));
    sequencer.start().await;
    sequencer.set_volume(volume).await;

    let preview = Arc::new(PreviewPlayer::new(Arc::clone(&state), preview_deck));

    // Song library with the built-in demo catalog
    let analysis = Arc::new(AnalysisClient::new(config.analysis_url.clone()));
    let library = Arc::new(Library::new(
        Arc::clone(&state),
        catalog,
        analysis,
        Arc::new(EnergyHeuristicPolicy),
    ));
    library.seed_demo_songs().await;

    let ctx = AppContext {
        state,
        sequencer,
        preview,
        library,
        db_pool,
        port: config.port,
    };

    api::server::run(&config, ctx)
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}
