//! In-memory song library and upload handling
//!
//! Holds the song collection, seeds the demo catalog, and runs the
//! upload pipeline: a per-file MIME gate, one backend liveness probe
//! per batch, and a background analysis task per accepted file. A
//! failed analysis retains the song without sections so the user can
//! retry later.

use std::sync::Arc;

use chrono::Utc;
use remix_common::events::RemixEvent;
use remix_common::models::{Mood, Section, SectionType, Song, ToneAttributes};
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::analysis::{AnalysisClient, SectionPolicy};
use crate::error::{Error, Result};
use crate::playback::TrackCatalog;
use crate::state::SharedState;

/// One file from a multipart upload request
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Song library shared across handlers and background tasks
pub struct Library {
    state: Arc<SharedState>,
    catalog: TrackCatalog,
    analysis: Arc<AnalysisClient>,
    policy: Arc<dyn SectionPolicy>,
    songs: Arc<RwLock<Vec<Song>>>,
}

impl Library {
    pub fn new(
        state: Arc<SharedState>,
        catalog: TrackCatalog,
        analysis: Arc<AnalysisClient>,
        policy: Arc<dyn SectionPolicy>,
    ) -> Self {
        Self {
            state,
            catalog,
            analysis,
            policy,
            songs: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Seed the library with the built-in demo songs
    pub async fn seed_demo_songs(&self) {
        let demo = demo_songs();
        let mut songs = self.songs.write().await;
        for song in demo {
            self.catalog.register(song.url.clone(), song.duration);
            songs.push(song);
        }
        info!("Seeded {} demo songs", songs.len());
    }

    pub async fn list(&self) -> Vec<Song> {
        self.songs.read().await.clone()
    }

    pub async fn get(&self, id: Uuid) -> Option<Song> {
        self.songs.read().await.iter().find(|s| s.id == id).cloned()
    }

    /// Accept a batch of uploaded files and start analysis for each
    ///
    /// A non-audio file is rejected individually before any network
    /// call and does not abort the rest of the batch. An unreachable
    /// analysis backend aborts the whole batch before any song is
    /// created. The returned songs are in the analyzing state; sections
    /// arrive via events once each background task completes.
    pub async fn upload_batch(&self, files: Vec<UploadedFile>) -> Result<Vec<Song>> {
        let (audio, rejected): (Vec<_>, Vec<_>) = files
            .into_iter()
            .partition(|f| f.content_type.starts_with("audio/"));
        for file in &rejected {
            warn!(
                "Rejected {}: not an audio file ({})",
                file.file_name, file.content_type
            );
        }
        if audio.is_empty() {
            return Err(Error::BadRequest("no audio files in upload".into()));
        }

        // One probe per batch; an unreachable backend aborts everything
        if !self.analysis.is_available().await {
            return Err(Error::Analysis(
                "analysis backend is not reachable".into(),
            ));
        }

        let mut accepted = Vec::with_capacity(audio.len());
        for file in audio {
            let song = self.admit_upload(file).await;
            accepted.push(song);
        }
        Ok(accepted)
    }

    /// Register one uploaded file and spawn its analysis task
    async fn admit_upload(&self, file: UploadedFile) -> Song {
        let title = title_from_file_name(&file.file_name);
        let mut song = Song::new(title, "Unknown Artist", 0.0, String::new());
        song.url = format!("upload://{}", song.id);
        song.is_analyzing = true;

        self.songs.write().await.push(song.clone());
        self.state.broadcast_event(RemixEvent::SongAdded {
            song_id: song.id,
            title: song.title.clone(),
            timestamp: Utc::now(),
        });

        let library = self.clone_handles();
        let song_id = song.id;
        let source = song.url.clone();
        tokio::spawn(async move {
            library.run_analysis(song_id, source, file).await;
        });

        song
    }

    async fn run_analysis(&self, song_id: Uuid, source: String, file: UploadedFile) {
        match self.analysis.analyze(&file.file_name, file.bytes).await {
            Ok(analysis) => {
                let sections = self.policy.derive(&analysis, song_id);
                let section_count = sections.len();
                self.catalog.register(source, analysis.duration_sec);

                let mut songs = self.songs.write().await;
                if let Some(song) = songs.iter_mut().find(|s| s.id == song_id) {
                    song.duration = analysis.duration_sec;
                    song.waveform_data =
                        Some(analysis.energy_rms.iter().map(|&e| e as f32).collect());
                    song.sections = Some(sections);
                    song.is_analyzing = false;
                } else {
                    warn!("Song {} vanished before analysis finished", song_id);
                    return;
                }
                drop(songs);

                info!("Analysis of {} produced {} sections", song_id, section_count);
                self.state.broadcast_event(RemixEvent::SongAnalysisCompleted {
                    song_id,
                    section_count,
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                // The song stays in the library without sections
                error!("Analysis of {} failed: {}", song_id, e);
                let mut songs = self.songs.write().await;
                if let Some(song) = songs.iter_mut().find(|s| s.id == song_id) {
                    song.is_analyzing = false;
                }
                drop(songs);

                self.state.broadcast_event(RemixEvent::SongAnalysisFailed {
                    song_id,
                    message: e.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }
    }

    fn clone_handles(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            catalog: self.catalog.clone(),
            analysis: Arc::clone(&self.analysis),
            policy: Arc::clone(&self.policy),
            songs: Arc::clone(&self.songs),
        }
    }
}

/// Derive a display title from an uploaded file name
fn title_from_file_name(file_name: &str) -> String {
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);
    let stem = stem.trim();
    if stem.is_empty() {
        "Untitled".to_string()
    } else {
        stem.to_string()
    }
}

/// Built-in demo songs with hand-curated sections
fn demo_songs() -> Vec<Song> {
    vec![
        demo_song(
            "Electric Dreams",
            "Neon Collective",
            240.0,
            "demo://electric-dreams",
            &[
                (SectionType::Intro, 0.0, 20.0, 35, Mood::Uplifting),
                (SectionType::Verse, 20.0, 70.0, 55, Mood::Energetic),
                (SectionType::Chorus, 70.0, 110.0, 85, Mood::Energetic),
                (SectionType::Verse, 110.0, 160.0, 60, Mood::Energetic),
                (SectionType::Chorus, 160.0, 210.0, 90, Mood::Energetic),
                (SectionType::Outro, 210.0, 240.0, 40, Mood::Calm),
            ],
        ),
        demo_song(
            "Midnight Journey",
            "Luna Waves",
            300.0,
            "demo://midnight-journey",
            &[
                (SectionType::Intro, 0.0, 30.0, 25, Mood::Calm),
                (SectionType::Verse, 30.0, 90.0, 45, Mood::Melancholic),
                (SectionType::Bridge, 90.0, 120.0, 50, Mood::Dramatic),
                (SectionType::Chorus, 120.0, 180.0, 75, Mood::Uplifting),
                (SectionType::Instrumental, 180.0, 260.0, 55, Mood::Dramatic),
                (SectionType::Outro, 260.0, 300.0, 30, Mood::Calm),
            ],
        ),
        demo_song(
            "Urban Pulse",
            "City Lights",
            210.0,
            "demo://urban-pulse",
            &[
                (SectionType::Intro, 0.0, 15.0, 45, Mood::Energetic),
                (SectionType::Verse, 15.0, 60.0, 65, Mood::Energetic),
                (SectionType::Chorus, 60.0, 100.0, 90, Mood::Energetic),
                (SectionType::Breakdown, 100.0, 130.0, 95, Mood::Dramatic),
                (SectionType::Chorus, 130.0, 180.0, 90, Mood::Energetic),
                (SectionType::Outro, 180.0, 210.0, 50, Mood::Uplifting),
            ],
        ),
    ]
}

fn demo_song(
    title: &str,
    artist: &str,
    duration: f64,
    url: &str,
    spans: &[(SectionType, f64, f64, u8, Mood)],
) -> Song {
    let mut song = Song::new(title, artist, duration, url);
    let span_count = spans.len();
    let sections = spans
        .iter()
        .enumerate()
        .filter_map(|(i, &(section_type, start, end, energy, mood))| {
            let tone = ToneAttributes {
                energy,
                intensity: (energy as u16 * 2).min(100) as u8,
                mood,
                strong_start: i == 0 || energy > 40,
                building_up: i < span_count / 2,
                slowing_down: i + 1 == span_count,
            };
            Section::new(song.id, section_type, start, end, tone).ok()
        })
        .collect();
    song.sections = Some(sections);
    song
}
