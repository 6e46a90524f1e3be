//! Integration tests for the remix player API
//!
//! Exercises the router end to end with `tower::ServiceExt::oneshot`
//! against an in-memory database and the simulated media outputs.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use remix_player::analysis::{AnalysisClient, EnergyHeuristicPolicy};
use remix_player::api::server::{create_router, AppContext};
use remix_player::db;
use remix_player::library::Library;
use remix_player::playback::{PreviewPlayer, Sequencer, SimulatedMedia, TrackCatalog};
use remix_player::state::SharedState;

async fn setup_router() -> axum::Router {
    let db_pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    db::init::init_schema(&db_pool).await.expect("schema");

    let state = Arc::new(SharedState::new());
    let catalog = TrackCatalog::new();
    let deck = Arc::new(SimulatedMedia::new(catalog.clone()));
    let preview_deck = Arc::new(SimulatedMedia::new(catalog.clone()));

    let sequencer = Arc::new(Sequencer::new(Arc::clone(&state), deck));
    sequencer.start().await;
    let preview = Arc::new(PreviewPlayer::new(Arc::clone(&state), preview_deck));

    let analysis = Arc::new(AnalysisClient::new("http://127.0.0.1:9"));
    let library = Arc::new(Library::new(
        Arc::clone(&state),
        catalog,
        analysis,
        Arc::new(EnergyHeuristicPolicy),
    ));
    library.seed_demo_songs().await;

    create_router(AppContext {
        state,
        sequencer,
        preview,
        library,
        db_pool,
        port: 5750,
    })
}

async fn request(
    app: &axum::Router,
    method: &str,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, Option<Value>) {
    let builder = Request::builder().method(method).uri(path);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let value = serde_json::from_slice(&bytes).ok();
    (status, value)
}

#[tokio::test]
async fn health_reports_module_and_version() {
    let app = setup_router().await;
    let (status, body) = request(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["module"], "remix-player");
}

#[tokio::test]
async fn playback_state_starts_idle() {
    let app = setup_router().await;
    let (status, body) = request(&app, "GET", "/playback/state", None).await;

    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["transport"], "idle");
    assert_eq!(body["isPlaying"], false);
    assert_eq!(body["currentSection"], Value::Null);
}

#[tokio::test]
async fn playing_an_empty_mix_leaves_state_idle() {
    let app = setup_router().await;
    let mix = json!({
        "id": Uuid::new_v4(),
        "name": "Empty",
        "sections": [],
        "createdAt": "2026-08-01T12:00:00Z",
        "updatedAt": "2026-08-01T12:00:00Z"
    });

    let (status, _) = request(&app, "POST", "/playback/play", Some(mix)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = request(&app, "GET", "/playback/state", None).await;
    assert_eq!(body.unwrap()["transport"], "idle");
}

#[tokio::test]
async fn volume_round_trips_and_clamps() {
    let app = setup_router().await;

    let (status, body) =
        request(&app, "POST", "/audio/volume", Some(json!({ "volume": 1.7 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["volume"], 1.0);

    let (status, body) = request(&app, "GET", "/audio/volume", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["volume"], 1.0);
}

#[tokio::test]
async fn demo_songs_are_listed_and_fetchable() {
    let app = setup_router().await;

    let (status, body) = request(&app, "GET", "/songs", None).await;
    assert_eq!(status, StatusCode::OK);
    let songs = body.unwrap();
    let songs = songs.as_array().unwrap();
    assert_eq!(songs.len(), 3);
    assert!(songs.iter().all(|s| s["sections"].is_array()));

    let id = songs[0]["id"].as_str().unwrap().to_string();
    let (status, body) = request(&app, "GET", &format!("/songs/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["id"], id);

    let (status, _) = request(&app, "GET", &format!("/songs/{}", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn preview_rejects_unknown_song_and_empty_interval() {
    let app = setup_router().await;

    let (status, _) = request(
        &app,
        "POST",
        "/preview/start",
        Some(json!({ "song_id": Uuid::new_v4(), "start": 0.0, "end": 10.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = request(&app, "GET", "/songs", None).await;
    let songs = body.unwrap();
    let id = songs[0]["id"].as_str().unwrap().to_string();
    let (status, _) = request(
        &app,
        "POST",
        "/preview/start",
        Some(json!({ "song_id": id, "start": 20.0, "end": 20.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // An interval starting past the end of the song is rejected too
    let (status, _) = request(
        &app,
        "POST",
        "/preview/start",
        Some(json!({ "song_id": id, "start": 1000.0, "end": 1010.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn mix_storage_crud_and_import_export() {
    let app = setup_router().await;

    let (status, body) = request(&app, "GET", "/mixes", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.unwrap().as_array().unwrap().is_empty());

    let mix = json!({
        "id": Uuid::new_v4(),
        "name": "Evening Set",
        "sections": [],
        "createdAt": "2026-08-01T12:00:00Z",
        "updatedAt": "2026-08-01T12:00:00Z"
    });
    let (status, body) = request(&app, "POST", "/mixes", Some(mix)).await;
    assert_eq!(status, StatusCode::OK);
    let saved_id = body.unwrap()["id"].as_str().unwrap().to_string();

    let (status, body) = request(&app, "GET", &format!("/mixes/{saved_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["name"], "Evening Set");

    // Export then import creates a sibling under a fresh id
    let (status, body) =
        request(&app, "GET", &format!("/mixes/{saved_id}/export"), None).await;
    assert_eq!(status, StatusCode::OK);
    let exported = body.unwrap();

    let (status, body) = request(&app, "POST", "/mixes/import", Some(exported)).await;
    assert_eq!(status, StatusCode::CREATED);
    let imported = body.unwrap();
    assert_ne!(imported["id"].as_str().unwrap(), saved_id);
    assert_eq!(imported["name"], "Evening Set (Imported)");

    let (_, body) = request(&app, "GET", "/mixes", None).await;
    assert_eq!(body.unwrap().as_array().unwrap().len(), 2);

    let (status, _) = request(&app, "DELETE", &format!("/mixes/{saved_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = request(&app, "DELETE", &format!("/mixes/{saved_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_import_is_rejected() {
    let app = setup_router().await;

    let (status, _) = request(
        &app,
        "POST",
        "/mixes/import",
        Some(json!({ "name": "no sections" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = request(&app, "GET", "/mixes", None).await;
    assert!(body.unwrap().as_array().unwrap().is_empty());
}
