//! Preview playback
//!
//! Independent, time-boxed one-shot playback of an arbitrary interval,
//! used to audition a candidate cut before adding it to a mix. The
//! preview owns its own media output, so starting or stopping a preview
//! never disturbs in-progress mix playback — the two may play at the
//! same time by design.

use crate::playback::media::{MediaOutput, MediaSignal};
use crate::state::{PreviewState, SharedState};
use remix_common::events::RemixEvent;
use remix_common::models::Song;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{interval, Duration};
use tracing::{debug, warn};

/// One-shot interval preview against its own media resource
pub struct PreviewPlayer {
    state: Arc<SharedState>,
    media: Arc<dyn MediaOutput>,
    /// Bumped on every start/stop; timers and signal listeners stamped
    /// with an older value are no-ops
    generation: Arc<AtomicU64>,
}

impl PreviewPlayer {
    pub fn new(state: Arc<SharedState>, media: Arc<dyn MediaOutput>) -> Self {
        Self {
            state,
            media,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start previewing `[start, end)` of a song
    ///
    /// Cancels any in-flight preview first. Arms a deadline for the
    /// interval length and a 1-second countdown of remaining time.
    /// The interval must begin inside the song; an end past the song's
    /// duration is clamped so the deadline matches the audible range.
    pub async fn preview_interval(&self, song: &Song, start: f64, end: f64) {
        if !(start < end) {
            warn!("preview ignored: empty interval {start}..{end}");
            return;
        }
        if start >= song.duration {
            warn!(
                "preview ignored: interval {start}..{end} starts past the end of '{}' ({:.1}s)",
                song.title, song.duration
            );
            return;
        }
        let end = end.min(song.duration);

        // Supersede any in-flight preview
        let generation = self.bump_generation();
        self.media.pause();

        let duration = end - start;
        let secs = duration.ceil() as u32;
        debug!("Previewing '{}' {:.1}s..{:.1}s", song.title, start, end);

        self.state
            .set_preview(PreviewState {
                is_playing: true,
                time_remaining: secs,
                duration: secs,
            })
            .await;
        self.state.broadcast_event(RemixEvent::PreviewStarted {
            song_id: song.id,
            start,
            end,
            timestamp: chrono::Utc::now(),
        });

        // Subscribe before load so the readiness signal cannot be missed
        let mut signals = self.media.subscribe();
        self.media.load(&song.url);

        let this = self.clone_handles();
        tokio::spawn(async move {
            loop {
                let signal = match signals.recv().await {
                    Ok(signal) => signal,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if this.generation.load(Ordering::Acquire) != generation {
                    break;
                }
                match signal {
                    MediaSignal::Ready => {
                        this.media.seek(start);
                        this.media.play();
                    }
                    MediaSignal::Ended => {
                        this.finish(generation).await;
                        break;
                    }
                    MediaSignal::Error(message) => {
                        warn!("Preview failed: {}", message);
                        this.finish(generation).await;
                        break;
                    }
                }
            }
        });

        // Deadline: the preview is time-boxed regardless of media state
        let this = self.clone_handles();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs_f64(duration)).await;
            this.finish(generation).await;
        });

        // 1-second countdown of remaining time
        let this = self.clone_handles();
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(1));
            ticker.tick().await; // first tick is immediate
            loop {
                ticker.tick().await;
                if this.generation.load(Ordering::Acquire) != generation {
                    break;
                }
                let mut preview = this.state.get_preview().await;
                if preview.time_remaining == 0 {
                    break;
                }
                preview.time_remaining -= 1;
                this.state.set_preview(preview).await;
                this.state.broadcast_event(RemixEvent::PreviewCountdown {
                    remaining_secs: preview.time_remaining,
                    timestamp: chrono::Utc::now(),
                });
                if preview.time_remaining == 0 {
                    break;
                }
            }
        });
    }

    /// Stop the preview; idempotent
    pub async fn stop_preview(&self) {
        let was_playing = self.state.get_preview().await.is_playing;
        self.bump_generation();
        self.media.pause();
        self.media.seek(0.0);
        self.state.set_preview(PreviewState::default()).await;
        if was_playing {
            self.state.broadcast_event(RemixEvent::PreviewStopped {
                timestamp: chrono::Utc::now(),
            });
        }
    }

    /// Deadline/natural-end/error path; behaves exactly as stop_preview
    /// but only if this preview is still the current one
    async fn finish(&self, generation: u64) {
        if self.generation.load(Ordering::Acquire) != generation {
            return;
        }
        self.stop_preview().await;
    }

    fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn clone_handles(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            media: Arc::clone(&self.media),
            generation: Arc::clone(&self.generation),
        }
    }
}
