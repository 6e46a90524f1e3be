//! Shared playback state
//!
//! Thread-safe state shared between the sequencer, the preview player,
//! and the HTTP handlers. Consumers read it as a snapshot; components
//! publish changes here and broadcast events for SSE.

use remix_common::events::{RemixEvent, TransportState};
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

/// Information about the section currently targeted by the sequencer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentSection {
    pub mix_id: Uuid,
    pub mix_section_id: Uuid,
    pub song_id: Uuid,
    pub section_index: usize,
    /// Effective (resolved) duration of the section, seconds
    pub duration: f64,
}

/// Preview playback state
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewState {
    pub is_playing: bool,
    pub time_remaining: u32,
    pub duration: u32,
}

impl Default for PreviewState {
    fn default() -> Self {
        Self {
            is_playing: false,
            time_remaining: 0,
            duration: 0,
        }
    }
}

/// Read-only snapshot of the full player state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub transport: TransportState,
    pub is_playing: bool,
    pub is_loading: bool,
    /// Position within the active section (0 = section start), seconds
    pub position: f64,
    pub current_section: Option<CurrentSection>,
    pub volume: f32,
    pub preview: PreviewState,
}

/// Shared state accessible by all components
///
/// RwLocks for concurrent read access with rare writes.
pub struct SharedState {
    /// Transport state of the sequencer
    pub transport: RwLock<TransportState>,

    /// Currently targeted section (None when idle)
    pub current_section: RwLock<Option<CurrentSection>>,

    /// Section-local playback position, seconds
    pub position: RwLock<f64>,

    /// Master volume (0.0-1.0)
    pub volume: RwLock<f32>,

    /// Preview resource state
    pub preview: RwLock<PreviewState>,

    /// Event broadcaster for SSE listeners
    pub event_tx: broadcast::Sender<RemixEvent>,
}

impl SharedState {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100); // Buffer up to 100 events
        Self {
            transport: RwLock::new(TransportState::Idle),
            current_section: RwLock::new(None),
            position: RwLock::new(0.0),
            volume: RwLock::new(1.0),
            preview: RwLock::new(PreviewState::default()),
            event_tx,
        }
    }

    /// Broadcast an event to all SSE listeners
    pub fn broadcast_event(&self, event: RemixEvent) {
        // Ignore send errors (no receivers is OK)
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to the event stream for SSE
    pub fn subscribe_events(&self) -> broadcast::Receiver<RemixEvent> {
        self.event_tx.subscribe()
    }

    pub async fn get_transport(&self) -> TransportState {
        *self.transport.read().await
    }

    pub async fn set_transport(&self, state: TransportState) {
        *self.transport.write().await = state;
    }

    pub async fn get_current_section(&self) -> Option<CurrentSection> {
        self.current_section.read().await.clone()
    }

    pub async fn set_current_section(&self, section: Option<CurrentSection>) {
        *self.current_section.write().await = section;
    }

    pub async fn get_position(&self) -> f64 {
        *self.position.read().await
    }

    pub async fn set_position(&self, position: f64) {
        *self.position.write().await = position;
    }

    pub async fn get_volume(&self) -> f32 {
        *self.volume.read().await
    }

    pub async fn set_volume(&self, volume: f32) {
        *self.volume.write().await = volume.clamp(0.0, 1.0);
    }

    pub async fn get_preview(&self) -> PreviewState {
        *self.preview.read().await
    }

    pub async fn set_preview(&self, preview: PreviewState) {
        *self.preview.write().await = preview;
    }

    /// Assemble a consistent snapshot for API consumers
    pub async fn snapshot(&self) -> PlayerSnapshot {
        let transport = self.get_transport().await;
        PlayerSnapshot {
            transport,
            is_playing: transport == TransportState::Playing,
            is_loading: transport == TransportState::Loading,
            position: self.get_position().await,
            current_section: self.get_current_section().await,
            volume: self.get_volume().await,
            preview: self.get_preview().await,
        }
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
