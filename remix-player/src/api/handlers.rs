//! HTTP request handlers
//!
//! Transport operations never surface playback faults as HTTP errors;
//! they complete and the observed state reflects the outcome. Errors
//! here are reserved for malformed requests, unknown resources, and
//! storage failures.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use remix_common::models::{Mix, Song};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use crate::api::server::AppContext;
use crate::db;
use crate::error::Error;
use crate::library::UploadedFile;
use crate::state::PlayerSnapshot;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    port: u16,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    error: String,
}

#[derive(Debug, Deserialize)]
pub struct SeekRequest {
    /// Target position within the active section, seconds
    position: f64,
}

#[derive(Debug, Deserialize)]
pub struct SkipRequest {
    section_index: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VolumeBody {
    /// Master volume, 0.0-1.0
    volume: f32,
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    song_id: Uuid,
    /// Interval bounds on the song timeline, seconds
    start: f64,
    end: f64,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(e: Error) -> ApiError {
    let status = match &e {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::BadRequest(_) | Error::Validation(_) | Error::Common(_) => StatusCode::BAD_REQUEST,
        Error::Analysis(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("Request failed: {}", e);
    }
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

fn ok() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
    })
}

// ============================================================================
// Health
// ============================================================================

/// GET /health
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "remix-player".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        port: ctx.port,
    })
}

// ============================================================================
// Playback Control
// ============================================================================

/// POST /playback/play - start playing the mix in the request body
///
/// The mix travels in full, so unsaved arrangements play without a
/// save step.
pub async fn play(State(ctx): State<AppContext>, Json(mix): Json<Mix>) -> Json<StatusResponse> {
    info!("Play requested: {} ({} sections)", mix.name, mix.sections.len());
    ctx.sequencer.play_mix(mix).await;
    ok()
}

/// POST /playback/pause
pub async fn pause(State(ctx): State<AppContext>) -> Json<StatusResponse> {
    ctx.sequencer.pause().await;
    ok()
}

/// POST /playback/resume
pub async fn resume(State(ctx): State<AppContext>) -> Json<StatusResponse> {
    ctx.sequencer.resume().await;
    ok()
}

/// POST /playback/stop
pub async fn stop(State(ctx): State<AppContext>) -> Json<StatusResponse> {
    ctx.sequencer.stop().await;
    ok()
}

/// POST /playback/seek - seek within the active section
pub async fn seek(
    State(ctx): State<AppContext>,
    Json(req): Json<SeekRequest>,
) -> Json<StatusResponse> {
    ctx.sequencer.seek_to(req.position).await;
    ok()
}

/// POST /playback/skip - jump to a section of the loaded mix
pub async fn skip(
    State(ctx): State<AppContext>,
    Json(req): Json<SkipRequest>,
) -> Json<StatusResponse> {
    ctx.sequencer.skip_to_section(req.section_index).await;
    ok()
}

/// GET /playback/state - full player snapshot
pub async fn get_playback_state(State(ctx): State<AppContext>) -> Json<PlayerSnapshot> {
    Json(ctx.state.snapshot().await)
}

// ============================================================================
// Volume
// ============================================================================

/// GET /audio/volume
pub async fn get_volume(State(ctx): State<AppContext>) -> Json<VolumeBody> {
    Json(VolumeBody {
        volume: ctx.state.get_volume().await,
    })
}

/// POST /audio/volume - set and persist master volume
pub async fn set_volume(
    State(ctx): State<AppContext>,
    Json(req): Json<VolumeBody>,
) -> Result<Json<VolumeBody>, ApiError> {
    ctx.sequencer.set_volume(req.volume).await;
    let applied = ctx.state.get_volume().await;
    db::storage::set_volume(&ctx.db_pool, applied)
        .await
        .map_err(error_response)?;
    Ok(Json(VolumeBody { volume: applied }))
}

// ============================================================================
// Section Preview
// ============================================================================

/// POST /preview/start - audition an interval of a library song
pub async fn start_preview(
    State(ctx): State<AppContext>,
    Json(req): Json<PreviewRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    if !(req.start < req.end) {
        return Err(error_response(Error::BadRequest(format!(
            "preview interval must satisfy start < end (got {}..{})",
            req.start, req.end
        ))));
    }
    let song = ctx
        .library
        .get(req.song_id)
        .await
        .ok_or_else(|| error_response(Error::NotFound(format!("song {}", req.song_id))))?;
    if req.start >= song.duration {
        return Err(error_response(Error::BadRequest(format!(
            "preview start {} is past the end of the song ({:.1}s)",
            req.start, song.duration
        ))));
    }

    ctx.preview.preview_interval(&song, req.start, req.end).await;
    Ok(ok())
}

/// POST /preview/stop
pub async fn stop_preview(State(ctx): State<AppContext>) -> Json<StatusResponse> {
    ctx.preview.stop_preview().await;
    ok()
}

// ============================================================================
// Song Library
// ============================================================================

/// GET /songs
pub async fn list_songs(State(ctx): State<AppContext>) -> Json<Vec<Song>> {
    Json(ctx.library.list().await)
}

/// GET /songs/:song_id
pub async fn get_song(
    State(ctx): State<AppContext>,
    Path(song_id): Path<Uuid>,
) -> Result<Json<Song>, ApiError> {
    ctx.library
        .get(song_id)
        .await
        .map(Json)
        .ok_or_else(|| error_response(Error::NotFound(format!("song {}", song_id))))
}

/// POST /songs/upload - multipart batch upload
///
/// Returns the accepted songs in the analyzing state; sections arrive
/// later via SSE events.
pub async fn upload_songs(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Vec<Song>>), ApiError> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| error_response(Error::BadRequest(format!("malformed multipart: {}", e))))?
    {
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| error_response(Error::BadRequest(format!("failed to read upload: {}", e))))?
            .to_vec();
        files.push(UploadedFile {
            file_name,
            content_type,
            bytes,
        });
    }

    let songs = ctx
        .library
        .upload_batch(files)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::ACCEPTED, Json(songs)))
}

// ============================================================================
// Stored Mixes
// ============================================================================

/// GET /mixes
pub async fn list_mixes(State(ctx): State<AppContext>) -> Result<Json<Vec<Mix>>, ApiError> {
    db::mixes::list_mixes(&ctx.db_pool)
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /mixes - save (insert or replace by id)
pub async fn save_mix(
    State(ctx): State<AppContext>,
    Json(mix): Json<Mix>,
) -> Result<Json<Mix>, ApiError> {
    let saved = db::mixes::save_mix(&ctx.db_pool, mix)
        .await
        .map_err(error_response)?;
    ctx.state
        .broadcast_event(remix_common::events::RemixEvent::MixesChanged {
            timestamp: chrono::Utc::now(),
        });
    Ok(Json(saved))
}

/// GET /mixes/:mix_id
pub async fn get_mix(
    State(ctx): State<AppContext>,
    Path(mix_id): Path<Uuid>,
) -> Result<Json<Mix>, ApiError> {
    db::mixes::get_mix(&ctx.db_pool, mix_id)
        .await
        .map_err(error_response)?
        .map(Json)
        .ok_or_else(|| error_response(Error::NotFound(format!("mix {}", mix_id))))
}

/// DELETE /mixes/:mix_id
pub async fn delete_mix(
    State(ctx): State<AppContext>,
    Path(mix_id): Path<Uuid>,
) -> Result<Json<StatusResponse>, ApiError> {
    let removed = db::mixes::delete_mix(&ctx.db_pool, mix_id)
        .await
        .map_err(error_response)?;
    if !removed {
        return Err(error_response(Error::NotFound(format!("mix {}", mix_id))));
    }
    ctx.state
        .broadcast_event(remix_common::events::RemixEvent::MixesChanged {
            timestamp: chrono::Utc::now(),
        });
    Ok(ok())
}

/// GET /mixes/:mix_id/export - interchange JSON document
pub async fn export_mix(
    State(ctx): State<AppContext>,
    Path(mix_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let json = db::mixes::export_mix(&ctx.db_pool, mix_id)
        .await
        .map_err(error_response)?;
    serde_json::from_str(&json)
        .map(Json)
        .map_err(|e| error_response(Error::Internal(format!("export serialization: {}", e))))
}

/// POST /mixes/import - validate and store an interchange document
pub async fn import_mix(
    State(ctx): State<AppContext>,
    body: String,
) -> Result<(StatusCode, Json<Mix>), ApiError> {
    let imported = db::mixes::import_mix(&ctx.db_pool, &body)
        .await
        .map_err(error_response)?;
    ctx.state
        .broadcast_event(remix_common::events::RemixEvent::MixesChanged {
            timestamp: chrono::Utc::now(),
        });
    Ok((StatusCode::CREATED, Json(imported)))
}
