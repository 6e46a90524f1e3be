//! Integration tests for the playback sequencer
//!
//! All tests run on a paused tokio clock with the simulated media
//! output, so section deadlines elapse instantly and deterministically.

use std::sync::Arc;

use remix_common::events::{RemixEvent, TransportState};
use remix_common::models::{Mix, MixSection, Mood, Section, SectionType, Song, ToneAttributes};
use remix_player::playback::{
    MediaOutput, MediaSignal, PreviewPlayer, Sequencer, SimulatedMedia, TrackCatalog,
};
use remix_player::state::SharedState;
use tokio::sync::broadcast;
use tokio::time::Duration;

/// Hand-scripted media output: ready immediately on load, ends only
/// when the test says so
struct ScriptedMedia {
    signal_tx: broadcast::Sender<MediaSignal>,
    position: std::sync::Mutex<f64>,
}

impl ScriptedMedia {
    fn new() -> Self {
        let (signal_tx, _) = broadcast::channel(16);
        Self {
            signal_tx,
            position: std::sync::Mutex::new(0.0),
        }
    }

    fn emit(&self, signal: MediaSignal) {
        let _ = self.signal_tx.send(signal);
    }
}

impl MediaOutput for ScriptedMedia {
    fn load(&self, _source: &str) {
        *self.position.lock().unwrap() = 0.0;
        let _ = self.signal_tx.send(MediaSignal::Ready);
    }

    fn seek(&self, position: f64) {
        *self.position.lock().unwrap() = position;
    }

    fn play(&self) {}
    fn pause(&self) {}
    fn set_volume(&self, _volume: f32) {}

    fn position(&self) -> f64 {
        *self.position.lock().unwrap()
    }

    fn subscribe(&self) -> broadcast::Receiver<MediaSignal> {
        self.signal_tx.subscribe()
    }
}

fn tone() -> ToneAttributes {
    ToneAttributes {
        energy: 50,
        intensity: 60,
        mood: Mood::Energetic,
        strong_start: true,
        building_up: false,
        slowing_down: false,
    }
}

fn song(catalog: &TrackCatalog, url: &str, duration: f64) -> Song {
    catalog.register(url, duration);
    Song::new("Test Song", "Test Artist", duration, url)
}

fn entry(song: &Song, start: f64, end: f64) -> MixSection {
    let section = Section::new(song.id, SectionType::Verse, start, end, tone()).unwrap();
    MixSection::new(song.clone(), section)
}

struct Harness {
    state: Arc<SharedState>,
    sequencer: Sequencer,
    catalog: TrackCatalog,
    events: broadcast::Receiver<RemixEvent>,
}

async fn harness() -> Harness {
    let state = Arc::new(SharedState::new());
    let catalog = TrackCatalog::new();
    let deck = Arc::new(SimulatedMedia::new(catalog.clone()));
    let sequencer = Sequencer::new(Arc::clone(&state), deck);
    sequencer.start().await;
    let events = state.subscribe_events();
    Harness {
        state,
        sequencer,
        catalog,
        events,
    }
}

/// Receive events until one matches, returning it
async fn wait_for<F>(rx: &mut broadcast::Receiver<RemixEvent>, mut pred: F) -> RemixEvent
where
    F: FnMut(&RemixEvent) -> bool,
{
    loop {
        let event = rx.recv().await.expect("event channel closed");
        if pred(&event) {
            return event;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn empty_mix_is_a_no_op() {
    let h = harness().await;

    h.sequencer.play_mix(Mix::new("Empty")).await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(h.state.get_transport().await, TransportState::Idle);
    assert!(h.state.get_current_section().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn sections_play_in_order_then_idle() {
    let mut h = harness().await;
    let song = song(&h.catalog, "demo://order", 60.0);

    let mut mix = Mix::new("Ordered");
    mix.add_section(entry(&song, 0.0, 2.0));
    mix.add_section(entry(&song, 10.0, 12.0));
    mix.add_section(entry(&song, 30.0, 33.0));

    h.sequencer.play_mix(mix).await;

    let mut started = Vec::new();
    let mut completed = Vec::new();
    loop {
        match h.events.recv().await.unwrap() {
            RemixEvent::SectionStarted { section_index, .. } => started.push(section_index),
            RemixEvent::SectionCompleted { section_index, .. } => completed.push(section_index),
            RemixEvent::MixCompleted { .. } => break,
            _ => {}
        }
    }

    assert_eq!(started, vec![0, 1, 2]);
    assert_eq!(completed, vec![0, 1, 2]);
    assert_eq!(h.state.get_transport().await, TransportState::Idle);
    assert!(h.state.get_current_section().await.is_none());
    assert_eq!(h.state.get_position().await, 0.0);
}

#[tokio::test(start_paused = true)]
async fn skip_jumps_and_out_of_range_is_ignored() {
    let mut h = harness().await;
    let song = song(&h.catalog, "demo://skip", 120.0);

    let mut mix = Mix::new("Skippable");
    mix.add_section(entry(&song, 0.0, 30.0));
    mix.add_section(entry(&song, 30.0, 60.0));
    mix.add_section(entry(&song, 60.0, 90.0));

    h.sequencer.play_mix(mix).await;
    wait_for(&mut h.events, |e| {
        matches!(e, RemixEvent::SectionStarted { section_index: 0, .. })
    })
    .await;

    h.sequencer.skip_to_section(2).await;
    wait_for(&mut h.events, |e| {
        matches!(e, RemixEvent::SectionStarted { section_index: 2, .. })
    })
    .await;

    // Out-of-range skip leaves the current section untouched
    h.sequencer.skip_to_section(10).await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    let current = h.state.get_current_section().await.unwrap();
    assert_eq!(current.section_index, 2);
    assert_eq!(h.state.get_transport().await, TransportState::Playing);
}

#[tokio::test(start_paused = true)]
async fn pause_retains_position_and_resume_continues() {
    let mut h = harness().await;
    let song = song(&h.catalog, "demo://pause", 60.0);

    let mut mix = Mix::new("Pausable");
    mix.add_section(entry(&song, 0.0, 30.0));

    h.sequencer.play_mix(mix).await;
    wait_for(&mut h.events, |e| {
        matches!(e, RemixEvent::SectionStarted { .. })
    })
    .await;

    tokio::time::sleep(Duration::from_secs(5)).await;
    h.sequencer.pause().await;
    assert_eq!(h.state.get_transport().await, TransportState::Paused);

    let paused_at = h.state.get_position().await;
    assert!((paused_at - 5.0).abs() < 0.3, "position was {paused_at}");

    // Time passing while paused does not move the position or advance
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.state.get_position().await, paused_at);
    assert_eq!(h.state.get_transport().await, TransportState::Paused);

    h.sequencer.resume().await;
    assert_eq!(h.state.get_transport().await, TransportState::Playing);

    // The remaining ~25 seconds elapse and the mix finishes
    wait_for(&mut h.events, |e| matches!(e, RemixEvent::MixCompleted { .. })).await;
    assert_eq!(h.state.get_transport().await, TransportState::Idle);
}

#[tokio::test(start_paused = true)]
async fn seek_clamps_to_section_end_without_double_advance() {
    let mut h = harness().await;
    let song = song(&h.catalog, "demo://seek", 60.0);

    let mut mix = Mix::new("Seekable");
    mix.add_section(entry(&song, 0.0, 30.0));

    h.sequencer.play_mix(mix).await;
    wait_for(&mut h.events, |e| {
        matches!(e, RemixEvent::SectionStarted { .. })
    })
    .await;

    h.sequencer.seek_to(1000.0).await;

    let mut completions = 0;
    loop {
        match h.events.recv().await.unwrap() {
            RemixEvent::SectionCompleted { .. } => completions += 1,
            RemixEvent::MixCompleted { .. } => break,
            _ => {}
        }
    }
    assert_eq!(completions, 1);
    assert_eq!(h.state.get_transport().await, TransportState::Idle);

    // The superseded full-duration deadline never fires a second advance
    tokio::time::sleep(Duration::from_secs(60)).await;
    let mut extra = 0;
    while let Ok(event) = h.events.try_recv() {
        if matches!(
            event,
            RemixEvent::SectionCompleted { .. } | RemixEvent::MixCompleted { .. }
        ) {
            extra += 1;
        }
    }
    assert_eq!(extra, 0);
}

#[tokio::test(start_paused = true)]
async fn volume_is_clamped_and_broadcast() {
    let mut h = harness().await;

    h.sequencer.set_volume(1.4).await;
    assert_eq!(h.state.get_volume().await, 1.0);

    h.sequencer.set_volume(-0.2).await;
    assert_eq!(h.state.get_volume().await, 0.0);

    let event = wait_for(&mut h.events, |e| {
        matches!(e, RemixEvent::VolumeChanged { .. })
    })
    .await;
    assert!(matches!(event, RemixEvent::VolumeChanged { volume, .. } if volume == 1.0));
}

#[tokio::test(start_paused = true)]
async fn media_error_pauses_without_advancing() {
    let mut h = harness().await;
    let known = song(&h.catalog, "demo://known", 60.0);
    // First entry references a source the catalog does not know
    let unknown = Song::new("Ghost", "Nobody", 60.0, "demo://unknown");

    let mut mix = Mix::new("Faulty");
    mix.add_section(entry(&unknown, 0.0, 10.0));
    mix.add_section(entry(&known, 0.0, 10.0));

    h.sequencer.play_mix(mix).await;

    let failed = wait_for(&mut h.events, |e| {
        matches!(e, RemixEvent::SectionFailed { .. })
    })
    .await;
    assert!(matches!(
        failed,
        RemixEvent::SectionFailed { section_index: 0, .. }
    ));
    assert_eq!(h.state.get_transport().await, TransportState::Paused);

    // No advance to the playable second section
    tokio::time::sleep(Duration::from_secs(60)).await;
    let current = h.state.get_current_section().await.unwrap();
    assert_eq!(current.section_index, 0);
    assert_eq!(h.state.get_transport().await, TransportState::Paused);
}

#[tokio::test(start_paused = true)]
async fn preview_and_mix_playback_are_independent() {
    let mut h = harness().await;
    let song = song(&h.catalog, "demo://both", 120.0);

    let preview_deck = Arc::new(SimulatedMedia::new(h.catalog.clone()));
    let preview = PreviewPlayer::new(Arc::clone(&h.state), preview_deck);

    let mut mix = Mix::new("Background");
    mix.add_section(entry(&song, 0.0, 60.0));
    h.sequencer.play_mix(mix).await;
    wait_for(&mut h.events, |e| {
        matches!(e, RemixEvent::SectionStarted { .. })
    })
    .await;

    preview.preview_interval(&song, 10.0, 13.0).await;
    assert!(h.state.get_preview().await.is_playing);
    assert_eq!(h.state.get_transport().await, TransportState::Playing);

    // The preview finishes by deadline; mix playback is undisturbed
    wait_for(&mut h.events, |e| {
        matches!(e, RemixEvent::PreviewStopped { .. })
    })
    .await;
    assert!(!h.state.get_preview().await.is_playing);
    assert_eq!(h.state.get_transport().await, TransportState::Playing);
    let current = h.state.get_current_section().await.unwrap();
    assert_eq!(current.section_index, 0);
}

#[tokio::test(start_paused = true)]
async fn natural_end_advances_like_the_deadline() {
    let state = Arc::new(SharedState::new());
    let deck = Arc::new(ScriptedMedia::new());
    let sequencer = Sequencer::new(Arc::clone(&state), Arc::clone(&deck) as Arc<dyn MediaOutput>);
    sequencer.start().await;
    let mut events = state.subscribe_events();

    // Deadlines are hours away; only the scripted Ended signals advance
    let song = Song::new("Scripted", "Nobody", 10_000.0, "fake://scripted");
    let mut mix = Mix::new("Natural End");
    mix.add_section(entry(&song, 0.0, 5000.0));
    mix.add_section(entry(&song, 5000.0, 10_000.0));

    sequencer.play_mix(mix).await;
    wait_for(&mut events, |e| {
        matches!(e, RemixEvent::SectionStarted { section_index: 0, .. })
    })
    .await;

    deck.emit(MediaSignal::Ended);
    wait_for(&mut events, |e| {
        matches!(e, RemixEvent::SectionStarted { section_index: 1, .. })
    })
    .await;

    deck.emit(MediaSignal::Ended);
    wait_for(&mut events, |e| matches!(e, RemixEvent::MixCompleted { .. })).await;
    assert_eq!(state.get_transport().await, TransportState::Idle);
}

#[tokio::test(start_paused = true)]
async fn pause_with_nothing_playing_stays_idle() {
    let h = harness().await;

    h.sequencer.pause().await;
    assert_eq!(h.state.get_transport().await, TransportState::Idle);

    // The same holds after a stop cleared the previous mix
    let song = song(&h.catalog, "demo://idlepause", 60.0);
    let mut mix = Mix::new("Brief");
    mix.add_section(entry(&song, 0.0, 30.0));
    h.sequencer.play_mix(mix).await;
    h.sequencer.stop().await;

    h.sequencer.pause().await;
    assert_eq!(h.state.get_transport().await, TransportState::Idle);
}

#[tokio::test(start_paused = true)]
async fn pause_before_ready_restarts_the_section_on_resume() {
    let state = Arc::new(SharedState::new());
    let catalog = TrackCatalog::new();
    let deck = Arc::new(SimulatedMedia::new(catalog.clone()));
    let sequencer = Sequencer::new(Arc::clone(&state), Arc::clone(&deck) as Arc<dyn MediaOutput>);
    sequencer.start().await;
    let mut events = state.subscribe_events();

    let song = song(&catalog, "demo://lateready", 120.0);
    let mut mix = Mix::new("Late Ready");
    mix.add_section(entry(&song, 60.0, 90.0));

    // Pause lands while the section is still Loading, before the deck
    // was sought to the interval start
    sequencer.play_mix(mix).await;
    sequencer.pause().await;
    assert_eq!(state.get_transport().await, TransportState::Paused);

    sequencer.resume().await;
    wait_for(&mut events, |e| {
        matches!(e, RemixEvent::SectionStarted { section_index: 0, .. })
    })
    .await;

    assert_eq!(state.get_transport().await, TransportState::Playing);
    let position = deck.position();
    assert!(
        position >= 60.0,
        "deck should play from the interval start, was at {position}"
    );
}

#[tokio::test(start_paused = true)]
async fn stop_before_ready_never_leaves_ghost_playback() {
    let mut h = harness().await;
    let song = song(&h.catalog, "demo://earlystop", 60.0);

    let mut mix = Mix::new("Stopped Early");
    mix.add_section(entry(&song, 0.0, 30.0));

    // Stop supersedes the pending readiness signal
    h.sequencer.play_mix(mix).await;
    h.sequencer.stop().await;

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(h.state.get_transport().await, TransportState::Idle);
    assert!(h.state.get_current_section().await.is_none());

    while let Ok(event) = h.events.try_recv() {
        assert!(
            !matches!(event, RemixEvent::SectionStarted { .. }),
            "stopped section must not start"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn preview_interval_is_bounded_by_the_song() {
    let mut h = harness().await;
    let song = song(&h.catalog, "demo://bounds", 120.0);

    let preview_deck = Arc::new(SimulatedMedia::new(h.catalog.clone()));
    let preview = PreviewPlayer::new(Arc::clone(&h.state), preview_deck);

    // An interval starting past the end of the song is ignored
    preview.preview_interval(&song, 130.0, 140.0).await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!h.state.get_preview().await.is_playing);

    // An end past the song clamps; the deadline covers the audible
    // 5 seconds, not the requested 15
    let started = tokio::time::Instant::now();
    preview.preview_interval(&song, 115.0, 130.0).await;
    let preview_state = h.state.get_preview().await;
    assert!(preview_state.is_playing);
    assert_eq!(preview_state.duration, 5);

    wait_for(&mut h.events, |e| {
        matches!(e, RemixEvent::PreviewStopped { .. })
    })
    .await;
    assert!(started.elapsed() < Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn stop_clears_everything() {
    let mut h = harness().await;
    let song = song(&h.catalog, "demo://stop", 60.0);

    let mut mix = Mix::new("Stoppable");
    mix.add_section(entry(&song, 0.0, 30.0));
    h.sequencer.play_mix(mix).await;
    wait_for(&mut h.events, |e| {
        matches!(e, RemixEvent::SectionStarted { .. })
    })
    .await;

    h.sequencer.stop().await;
    assert_eq!(h.state.get_transport().await, TransportState::Idle);
    assert!(h.state.get_current_section().await.is_none());
    assert_eq!(h.state.get_position().await, 0.0);

    // Skip after stop has no mix to act on
    h.sequencer.skip_to_section(0).await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(h.state.get_transport().await, TransportState::Idle);
}
