//! Media output abstraction
//!
//! The sequencer and the preview player each own one media output
//! resource. The resource is an explicit handle, not a process-wide
//! singleton: each player instance creates its own and the two never
//! affect each other.
//!
//! Readiness, natural end, and faults are reported asynchronously as
//! `MediaSignal`s on a broadcast channel; callers subscribe before
//! loading so no signal can be missed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::broadcast;
use tokio::time::{Duration, Instant};
use tracing::{debug, warn};

/// Asynchronous notifications from a media output
#[derive(Debug, Clone)]
pub enum MediaSignal {
    /// The loaded source is ready to play
    Ready,
    /// Playback reached the natural end of the source
    Ended,
    /// The source could not be loaded or played
    Error(String),
}

/// A single owned media output resource
///
/// Command methods are synchronous and cheap; readiness and completion
/// arrive as signals. Mutating one instance (volume, position) never
/// affects another.
pub trait MediaOutput: Send + Sync {
    /// Repoint the resource at a new source and begin loading.
    /// Resets position to zero; a `Ready` or `Error` signal follows.
    fn load(&self, source: &str);

    /// Seek to an absolute position on the source timeline, seconds
    fn seek(&self, position: f64);

    /// Begin or continue playback from the current position
    fn play(&self);

    /// Pause, retaining the current position
    fn pause(&self);

    /// Set output volume (0.0-1.0); independent of play/pause state
    fn set_volume(&self, volume: f32);

    /// Current absolute position on the source timeline, seconds
    fn position(&self) -> f64;

    /// Subscribe to this resource's signals
    fn subscribe(&self) -> broadcast::Receiver<MediaSignal>;
}

/// Registry of playable sources and their durations
///
/// The simulated output has no decoder, so the library registers each
/// song's locator and total duration here when the song is created.
#[derive(Debug, Clone, Default)]
pub struct TrackCatalog {
    inner: Arc<RwLock<HashMap<String, f64>>>,
}

impl TrackCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, source: impl Into<String>, duration: f64) {
        self.inner
            .write()
            .expect("catalog lock poisoned")
            .insert(source.into(), duration);
    }

    pub fn duration_of(&self, source: &str) -> Option<f64> {
        self.inner
            .read()
            .expect("catalog lock poisoned")
            .get(source)
            .copied()
    }
}

struct MediaInner {
    source: Option<String>,
    duration: f64,
    /// Position at the last play/seek/pause transition
    base_position: f64,
    /// Set while playing; position advances with the clock from here
    played_since: Option<Instant>,
    volume: f32,
    /// Bumped on every load/seek/play/pause so in-flight readiness and
    /// end watchers for a superseded operation become no-ops
    epoch: u64,
}

/// Clock-backed media output
///
/// Stands in for a real device pipeline: position advances in real time
/// while playing, `Ready` arrives after a short load delay, `Ended`
/// fires when the catalog duration elapses. Unknown sources signal
/// `Error`. Driven by the tokio clock, so tests on a paused clock are
/// fully deterministic.
pub struct SimulatedMedia {
    catalog: TrackCatalog,
    inner: Arc<Mutex<MediaInner>>,
    signal_tx: broadcast::Sender<MediaSignal>,
    ready_delay: Duration,
}

impl SimulatedMedia {
    pub fn new(catalog: TrackCatalog) -> Self {
        let (signal_tx, _) = broadcast::channel(16);
        Self {
            catalog,
            inner: Arc::new(Mutex::new(MediaInner {
                source: None,
                duration: 0.0,
                base_position: 0.0,
                played_since: None,
                volume: 1.0,
                epoch: 0,
            })),
            signal_tx,
            ready_delay: Duration::from_millis(10),
        }
    }

    /// Override the simulated load delay (mainly for tests)
    pub fn with_ready_delay(mut self, delay: Duration) -> Self {
        self.ready_delay = delay;
        self
    }

    /// Arm a watcher that signals `Ended` when the remaining duration
    /// elapses, unless the epoch moves on first
    fn arm_end_watcher(&self, epoch: u64, remaining: f64) {
        let inner = Arc::clone(&self.inner);
        let signal_tx = self.signal_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs_f64(remaining.max(0.0))).await;
            let mut guard = inner.lock().expect("media lock poisoned");
            if guard.epoch != epoch || guard.played_since.is_none() {
                return; // superseded
            }
            guard.base_position = guard.duration;
            guard.played_since = None;
            guard.epoch += 1;
            drop(guard);
            let _ = signal_tx.send(MediaSignal::Ended);
        });
    }
}

impl MediaOutput for SimulatedMedia {
    fn load(&self, source: &str) {
        let signal_tx = self.signal_tx.clone();
        let duration = self.catalog.duration_of(source);

        let mut guard = self.inner.lock().expect("media lock poisoned");
        guard.epoch += 1;
        let epoch = guard.epoch;
        guard.source = Some(source.to_string());
        guard.duration = duration.unwrap_or(0.0);
        guard.base_position = 0.0;
        guard.played_since = None;
        drop(guard);

        match duration {
            Some(d) => {
                debug!("Loading source {} (duration {:.1}s)", source, d);
                let inner = Arc::clone(&self.inner);
                let delay = self.ready_delay;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let guard = inner.lock().expect("media lock poisoned");
                    let stale = guard.epoch != epoch;
                    drop(guard);
                    if !stale {
                        let _ = signal_tx.send(MediaSignal::Ready);
                    }
                });
            }
            None => {
                warn!("Unknown media source: {}", source);
                let source = source.to_string();
                tokio::spawn(async move {
                    let _ = signal_tx.send(MediaSignal::Error(format!(
                        "unknown media source: {source}"
                    )));
                });
            }
        }
    }

    fn seek(&self, position: f64) {
        let mut guard = self.inner.lock().expect("media lock poisoned");
        guard.epoch += 1;
        let epoch = guard.epoch;
        guard.base_position = position.clamp(0.0, guard.duration);
        let playing = guard.played_since.is_some();
        if playing {
            guard.played_since = Some(Instant::now());
        }
        let remaining = guard.duration - guard.base_position;
        drop(guard);

        if playing {
            self.arm_end_watcher(epoch, remaining);
        }
    }

    fn play(&self) {
        let mut guard = self.inner.lock().expect("media lock poisoned");
        if guard.source.is_none() || guard.played_since.is_some() {
            return;
        }
        guard.epoch += 1;
        let epoch = guard.epoch;
        guard.played_since = Some(Instant::now());
        let remaining = guard.duration - guard.base_position;
        drop(guard);

        self.arm_end_watcher(epoch, remaining);
    }

    fn pause(&self) {
        let mut guard = self.inner.lock().expect("media lock poisoned");
        if let Some(since) = guard.played_since.take() {
            guard.epoch += 1;
            let elapsed = since.elapsed().as_secs_f64();
            guard.base_position = (guard.base_position + elapsed).min(guard.duration);
        }
    }

    fn set_volume(&self, volume: f32) {
        self.inner.lock().expect("media lock poisoned").volume = volume.clamp(0.0, 1.0);
    }

    fn position(&self) -> f64 {
        let guard = self.inner.lock().expect("media lock poisoned");
        match guard.played_since {
            Some(since) => (guard.base_position + since.elapsed().as_secs_f64()).min(guard.duration),
            None => guard.base_position,
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<MediaSignal> {
        self.signal_tx.subscribe()
    }
}
