//! Event types for the Remix event system
//!
//! Events are broadcast through a tokio broadcast channel and serialized
//! for SSE transmission. One central enum keeps matching exhaustive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sequencer transport state
///
/// Idle -> Loading -> Playing <-> Paused -> Idle; Playing re-enters
/// Loading at every section boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportState {
    Idle,
    Loading,
    Playing,
    Paused,
}

impl std::fmt::Display for TransportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportState::Idle => write!(f, "idle"),
            TransportState::Loading => write!(f, "loading"),
            TransportState::Playing => write!(f, "playing"),
            TransportState::Paused => write!(f, "paused"),
        }
    }
}

/// Remix event types, broadcast to all SSE listeners
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RemixEvent {
    /// Transport state changed
    PlaybackStateChanged {
        old_state: TransportState,
        new_state: TransportState,
        timestamp: DateTime<Utc>,
    },

    /// A mix section started playing
    SectionStarted {
        mix_id: Uuid,
        section_index: usize,
        song_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// A mix section finished (deadline or natural end)
    SectionCompleted {
        mix_id: Uuid,
        section_index: usize,
        timestamp: DateTime<Utc>,
    },

    /// A section failed to load or play; playback halted without advance
    SectionFailed {
        mix_id: Uuid,
        section_index: usize,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// The last section of the mix finished
    MixCompleted {
        mix_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Periodic position report while playing
    ///
    /// `position` is section-local (0 = section start), seconds.
    PlaybackProgress {
        mix_id: Uuid,
        section_index: usize,
        position: f64,
        duration: f64,
        timestamp: DateTime<Utc>,
    },

    /// Master volume changed (0.0-1.0)
    VolumeChanged {
        volume: f32,
        timestamp: DateTime<Utc>,
    },

    /// Preview playback started
    PreviewStarted {
        song_id: Uuid,
        start: f64,
        end: f64,
        timestamp: DateTime<Utc>,
    },

    /// Preview countdown tick (1-second granularity)
    PreviewCountdown {
        remaining_secs: u32,
        timestamp: DateTime<Utc>,
    },

    /// Preview stopped (explicit, deadline, natural end, or error)
    PreviewStopped {
        timestamp: DateTime<Utc>,
    },

    /// A song was added to the library
    SongAdded {
        song_id: Uuid,
        title: String,
        timestamp: DateTime<Utc>,
    },

    /// Structural analysis finished and sections were attached
    SongAnalysisCompleted {
        song_id: Uuid,
        section_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Structural analysis failed; the song is retained without sections
    SongAnalysisFailed {
        song_id: Uuid,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// The stored mix collection changed (save/delete/import)
    MixesChanged {
        timestamp: DateTime<Utc>,
    },
}

impl RemixEvent {
    /// Stable event name for the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            RemixEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            RemixEvent::SectionStarted { .. } => "SectionStarted",
            RemixEvent::SectionCompleted { .. } => "SectionCompleted",
            RemixEvent::SectionFailed { .. } => "SectionFailed",
            RemixEvent::MixCompleted { .. } => "MixCompleted",
            RemixEvent::PlaybackProgress { .. } => "PlaybackProgress",
            RemixEvent::VolumeChanged { .. } => "VolumeChanged",
            RemixEvent::PreviewStarted { .. } => "PreviewStarted",
            RemixEvent::PreviewCountdown { .. } => "PreviewCountdown",
            RemixEvent::PreviewStopped { .. } => "PreviewStopped",
            RemixEvent::SongAdded { .. } => "SongAdded",
            RemixEvent::SongAnalysisCompleted { .. } => "SongAnalysisCompleted",
            RemixEvent::SongAnalysisFailed { .. } => "SongAnalysisFailed",
            RemixEvent::MixesChanged { .. } => "MixesChanged",
        }
    }
}
