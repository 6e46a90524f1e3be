//! Playback sequencer
//!
//! **Responsibilities:**
//! - Owns the mix being played and the current section index
//! - Section player: drives the owned deck through exactly one resolved
//!   interval at a time and detects its completion
//! - Transport controls (play_mix, pause, resume, stop, seek, skip, volume)
//! - Section-end advance: deadline or natural end moves straight to the
//!   next section; past the last section the sequencer returns to Idle
//!
//! All media readiness, tick, deadline, and fault notifications are
//! converted to `EngineEvent`s and dispatched through one handler on one
//! event loop. Each event carries the operation generation current when
//! its source was armed; any transport operation that changes the active
//! interval bumps the generation first, so a stale timer firing into a
//! since-changed sequence is a guaranteed no-op.

use crate::playback::events::EngineEvent;
use crate::playback::interval::{resolve, ResolvedInterval};
use crate::playback::media::{MediaOutput, MediaSignal};
use crate::state::{CurrentSection, SharedState};
use remix_common::events::{RemixEvent, TransportState};
use remix_common::models::{Mix, MixSection};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Position tick period while playing
const TICK_PERIOD: Duration = Duration::from_millis(100);
/// Ticks between PlaybackProgress broadcasts (1s at the tick period)
const PROGRESS_EVERY_TICKS: u64 = 10;

/// The section currently targeted by the sequencer
struct ActiveSection {
    index: usize,
    mix_id: Uuid,
    entry: MixSection,
    interval: ResolvedInterval,
    ticks: u64,
    /// True once readiness was applied (deck sought to the interval
    /// start); a pause before this point must reload on resume
    ready: bool,
}

/// Mix playback sequencer
pub struct Sequencer {
    state: Arc<SharedState>,

    /// The single owned media output for mix playback
    deck: Arc<dyn MediaOutput>,

    /// Mix being played (retained after natural completion so skips can
    /// restart it; cleared by stop)
    mix: Arc<RwLock<Option<Mix>>>,

    /// Active section bookkeeping
    active: Arc<RwLock<Option<ActiveSection>>>,

    /// Operation generation; timers and media waits are stamped with the
    /// generation current when armed
    generation: Arc<AtomicU64>,

    /// Engine event channel sender
    event_tx: mpsc::UnboundedSender<EngineEvent>,

    /// Engine event channel receiver, taken once by the event loop
    event_rx: Arc<RwLock<Option<mpsc::UnboundedReceiver<EngineEvent>>>>,
}

impl Sequencer {
    pub fn new(state: Arc<SharedState>, deck: Arc<dyn MediaOutput>) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            state,
            deck,
            mix: Arc::new(RwLock::new(None)),
            active: Arc::new(RwLock::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
            event_tx,
            event_rx: Arc::new(RwLock::new(Some(event_rx))),
        }
    }

    /// Start the event loop in the background
    ///
    /// Must be called exactly once before any transport operation.
    pub async fn start(&self) {
        let rx = self.event_rx.write().await.take();
        let Some(mut rx) = rx else {
            warn!("Sequencer event loop already started");
            return;
        };
        let this = self.clone_handles();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                this.handle_event(event).await;
            }
            debug!("Sequencer event loop stopped");
        });
        info!("Sequencer started");
    }

    /// Begin playback of a mix from its first section
    ///
    /// A mix with zero sections is a no-op and leaves all state
    /// unchanged. Any previously playing mix is implicitly replaced and
    /// its pending timers are canceled.
    pub async fn play_mix(&self, mix: Mix) {
        if mix.sections.is_empty() {
            debug!("play_mix ignored: mix '{}' has no sections", mix.name);
            return;
        }
        info!("Starting mix playback: '{}' ({} sections)", mix.name, mix.sections.len());
        *self.mix.write().await = Some(mix);
        self.start_section(0).await;
    }

    /// Pause playback, retaining position for resume
    ///
    /// With no active section there is nothing to pause; Idle never
    /// transitions to Paused.
    pub async fn pause(&self) {
        if self.active.read().await.is_none() {
            debug!("pause ignored: no active section");
            return;
        }
        self.bump_generation();
        self.deck.pause();
        self.set_transport(TransportState::Paused).await;
    }

    /// Resume from the retained position
    ///
    /// Re-arms the deadline for the remaining duration of the current
    /// section, not the full section duration. A section paused before
    /// its media became ready never reached the interval start, so it
    /// is restarted from the top instead.
    pub async fn resume(&self) {
        let (index, ready, remaining) = {
            let active = self.active.read().await;
            let Some(active) = active.as_ref() else {
                debug!("resume ignored: no active section");
                return;
            };
            let elapsed = (self.deck.position() - active.interval.start).max(0.0);
            (
                active.index,
                active.ready,
                (active.interval.duration - elapsed).max(0.0),
            )
        };

        if !ready {
            // The pause superseded the pending Ready, so the deck was
            // never positioned; reload the section
            self.start_section(index).await;
            return;
        }

        let generation = self.bump_generation();
        self.deck.play();
        self.set_transport(TransportState::Playing).await;
        self.arm_deadline(remaining, generation);
        self.arm_ticks(generation);
    }

    /// Halt playback and return to Idle
    ///
    /// Resets position to zero and clears the current mix and section
    /// pointers.
    pub async fn stop(&self) {
        self.bump_generation();
        self.deck.pause();
        self.deck.seek(0.0);

        *self.mix.write().await = None;
        *self.active.write().await = None;
        self.state.set_current_section(None).await;
        self.state.set_position(0.0).await;
        self.set_transport(TransportState::Idle).await;
        info!("Playback stopped");
    }

    /// Seek within the current section's local timeline
    ///
    /// `time` is interpreted as an offset from the section start and
    /// clamped to [0, section duration]; the deadline is re-armed for the
    /// remaining duration so a boundary seek cannot double-advance.
    pub async fn seek_to(&self, time: f64) {
        let (interval, clamped) = {
            let active = self.active.read().await;
            let Some(active) = active.as_ref() else {
                debug!("seek ignored: no active section");
                return;
            };
            (active.interval, time.clamp(0.0, active.interval.duration))
        };

        self.deck.seek(interval.start + clamped);
        self.state.set_position(clamped).await;

        if self.state.get_transport().await == TransportState::Playing {
            let generation = self.bump_generation();
            self.arm_deadline(interval.duration - clamped, generation);
            self.arm_ticks(generation);
        }
    }

    /// Jump to an arbitrary section of the current mix
    ///
    /// Out-of-range indices are a no-op. The current index is updated
    /// immediately, even if the target section later fails to load.
    pub async fn skip_to_section(&self, index: usize) {
        let in_range = {
            let mix = self.mix.read().await;
            match mix.as_ref() {
                Some(mix) => index < mix.sections.len(),
                None => false,
            }
        };
        if !in_range {
            debug!("skip_to_section ignored: index {} out of range", index);
            return;
        }
        info!("Skipping to section {}", index);
        self.start_section(index).await;
    }

    /// Set master volume, clamped to [0, 1]
    ///
    /// Applies immediately to the deck, independent of transport state.
    pub async fn set_volume(&self, volume: f32) {
        let clamped = volume.clamp(0.0, 1.0);
        self.deck.set_volume(clamped);
        self.state.set_volume(clamped).await;
        self.state.broadcast_event(RemixEvent::VolumeChanged {
            volume: clamped,
            timestamp: chrono::Utc::now(),
        });
    }

    // ------------------------------------------------------------------
    // Section player
    // ------------------------------------------------------------------

    /// Play exactly one resolved interval through the deck
    ///
    /// Supersedes any in-flight section: the generation is bumped first,
    /// so pending timers and media waits of the previous section can no
    /// longer act.
    async fn start_section(&self, index: usize) {
        let generation = self.bump_generation();

        let (entry, mix_id) = {
            let mix = self.mix.read().await;
            let Some(mix) = mix.as_ref() else { return };
            let Some(entry) = mix.sections.get(index) else { return };
            (entry.clone(), mix.id)
        };
        let interval = resolve(&entry);

        debug!(
            "Starting section {} of mix {}: '{}' {} ({:.1}s..{:.1}s)",
            index, mix_id, entry.song.title, entry.section.section_type, interval.start, interval.end
        );

        *self.active.write().await = Some(ActiveSection {
            index,
            mix_id,
            entry: entry.clone(),
            interval,
            ticks: 0,
            ready: false,
        });
        self.state
            .set_current_section(Some(CurrentSection {
                mix_id,
                mix_section_id: entry.id,
                song_id: entry.song.id,
                section_index: index,
                duration: interval.duration,
            }))
            .await;
        self.state.set_position(0.0).await;
        self.set_transport(TransportState::Loading).await;

        // Repoint the deck and wait for readiness. Subscribing before
        // load guarantees the signal is observed.
        self.deck.pause();
        let mut signals = self.deck.subscribe();
        self.deck.load(&entry.song.url);

        // Bridge media signals into engine events for this section's
        // lifetime. The task exits as soon as the generation moves on.
        let event_tx = self.event_tx.clone();
        let current = Arc::clone(&self.generation);
        tokio::spawn(async move {
            loop {
                let signal = match signals.recv().await {
                    Ok(signal) => signal,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if current.load(Ordering::Acquire) != generation {
                    break;
                }
                match signal {
                    MediaSignal::Ready => {
                        let _ = event_tx.send(EngineEvent::Ready { generation });
                    }
                    MediaSignal::Ended => {
                        let _ = event_tx.send(EngineEvent::Ended { generation });
                        break;
                    }
                    MediaSignal::Error(message) => {
                        let _ = event_tx.send(EngineEvent::Error { generation, message });
                        break;
                    }
                }
            }
        });
    }

    // ------------------------------------------------------------------
    // Event handling
    // ------------------------------------------------------------------

    /// Single dispatch point for all engine events
    async fn handle_event(&self, event: EngineEvent) {
        if event.generation() != self.generation.load(Ordering::Acquire) {
            // Superseded by a later transport operation
            return;
        }

        match event {
            EngineEvent::Ready { generation } => self.on_ready(generation).await,
            EngineEvent::Tick { .. } => self.on_tick().await,
            EngineEvent::Deadline { .. } | EngineEvent::Ended { .. } => self.advance().await,
            EngineEvent::Error { message, .. } => self.on_error(message).await,
        }
    }

    /// Media became ready: seek to the interval start and begin playback
    ///
    /// Transport operations run on other tasks, so the generation is
    /// re-verified around the deck commands and inside the transport
    /// transition: a stop or play_mix landing mid-apply wins, and this
    /// ready can no longer leave the deck playing or the state Playing.
    async fn on_ready(&self, generation: u64) {
        let (interval, mix_id, index, song_id) = {
            let mut active = self.active.write().await;
            let Some(active) = active.as_mut() else { return };
            active.ready = true;
            (
                active.interval,
                active.mix_id,
                active.index,
                active.entry.song.id,
            )
        };

        if self.generation.load(Ordering::Acquire) != generation {
            return;
        }
        self.deck.seek(interval.start);
        self.deck.set_volume(self.state.get_volume().await);
        self.deck.play();
        if self.generation.load(Ordering::Acquire) != generation {
            // Superseded between dispatch and the deck commands; the
            // successor owns the deck from here
            self.deck.pause();
            return;
        }
        if !self.set_transport_if_current(TransportState::Playing, generation).await {
            self.deck.pause();
            return;
        }

        self.state.broadcast_event(RemixEvent::SectionStarted {
            mix_id,
            section_index: index,
            song_id,
            timestamp: chrono::Utc::now(),
        });

        self.arm_deadline(interval.duration, generation);
        self.arm_ticks(generation);
    }

    /// Position tick: report section-local position
    async fn on_tick(&self) {
        let (position, progress) = {
            let mut active = self.active.write().await;
            let Some(active) = active.as_mut() else { return };
            active.ticks += 1;
            let position = (self.deck.position() - active.interval.start)
                .clamp(0.0, active.interval.duration);
            let progress = (active.ticks % PROGRESS_EVERY_TICKS == 0).then(|| {
                RemixEvent::PlaybackProgress {
                    mix_id: active.mix_id,
                    section_index: active.index,
                    position,
                    duration: active.interval.duration,
                    timestamp: chrono::Utc::now(),
                }
            });
            (position, progress)
        };

        self.state.set_position(position).await;
        if let Some(event) = progress {
            self.state.broadcast_event(event);
        }
    }

    /// Section completed (deadline elapsed or media ended naturally):
    /// move to the next section without a gap, or finish the mix
    async fn advance(&self) {
        let (mix_id, completed_index) = {
            let active = self.active.read().await;
            let Some(active) = active.as_ref() else { return };
            (active.mix_id, active.index)
        };
        self.state.broadcast_event(RemixEvent::SectionCompleted {
            mix_id,
            section_index: completed_index,
            timestamp: chrono::Utc::now(),
        });

        let next = completed_index + 1;
        let section_count = {
            let mix = self.mix.read().await;
            mix.as_ref().map(|m| m.sections.len()).unwrap_or(0)
        };

        if next < section_count {
            self.start_section(next).await;
        } else {
            info!("Mix {} completed", mix_id);
            self.bump_generation();
            self.deck.pause();
            *self.active.write().await = None;
            self.state.set_current_section(None).await;
            self.state.set_position(0.0).await;
            self.set_transport(TransportState::Idle).await;
            self.state.broadcast_event(RemixEvent::MixCompleted {
                mix_id,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    /// Media fault: halt without advancing, loading cleared, no retry
    async fn on_error(&self, message: String) {
        error!("Section playback failed: {}", message);
        let info = {
            let active = self.active.read().await;
            active.as_ref().map(|a| (a.mix_id, a.index))
        };
        self.deck.pause();
        self.set_transport(TransportState::Paused).await;
        if let Some((mix_id, section_index)) = info {
            self.state.broadcast_event(RemixEvent::SectionFailed {
                mix_id,
                section_index,
                message,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Arm the one-shot deadline timer for the active interval
    ///
    /// At most one deadline can act per generation: an earlier timer
    /// whose generation was superseded is ignored on arrival.
    fn arm_deadline(&self, duration: f64, generation: u64) {
        let event_tx = self.event_tx.clone();
        let current = Arc::clone(&self.generation);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs_f64(duration.max(0.0))).await;
            if current.load(Ordering::Acquire) == generation {
                let _ = event_tx.send(EngineEvent::Deadline { generation });
            }
        });
    }

    /// Arm the periodic position tick; the task exits when the
    /// generation moves on
    fn arm_ticks(&self, generation: u64) {
        let event_tx = self.event_tx.clone();
        let current = Arc::clone(&self.generation);
        tokio::spawn(async move {
            let mut ticker = interval(TICK_PERIOD);
            ticker.tick().await; // first tick is immediate
            loop {
                ticker.tick().await;
                if current.load(Ordering::Acquire) != generation {
                    break;
                }
                if event_tx.send(EngineEvent::Tick { generation }).is_err() {
                    break;
                }
            }
        });
    }

    /// Transition the transport only while `generation` is current
    ///
    /// The check happens under the transport write lock: a concurrent
    /// transport operation bumps the generation before writing its own
    /// state, so it either suppresses this transition or overwrites it.
    async fn set_transport_if_current(
        &self,
        new_state: TransportState,
        generation: u64,
    ) -> bool {
        let mut transport = self.state.transport.write().await;
        if self.generation.load(Ordering::Acquire) != generation {
            return false;
        }
        let old_state = *transport;
        if old_state == new_state {
            return true;
        }
        *transport = new_state;
        drop(transport);
        self.state.broadcast_event(RemixEvent::PlaybackStateChanged {
            old_state,
            new_state,
            timestamp: chrono::Utc::now(),
        });
        true
    }

    async fn set_transport(&self, new_state: TransportState) {
        let old_state = self.state.get_transport().await;
        if old_state == new_state {
            return;
        }
        self.state.set_transport(new_state).await;
        self.state.broadcast_event(RemixEvent::PlaybackStateChanged {
            old_state,
            new_state,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Clone the sequencer's handles for sharing across tasks
    fn clone_handles(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            deck: Arc::clone(&self.deck),
            mix: Arc::clone(&self.mix),
            active: Arc::clone(&self.active),
            generation: Arc::clone(&self.generation),
            event_tx: self.event_tx.clone(),
            event_rx: Arc::clone(&self.event_rx),
        }
    }
}
