//! Mix playback: interval resolution, media output abstraction,
//! sequencer state machine, and preview playback

pub mod events;
pub mod interval;
pub mod media;
pub mod preview;
pub mod sequencer;

pub use interval::{resolve, ResolvedInterval};
pub use media::{MediaOutput, MediaSignal, SimulatedMedia, TrackCatalog};
pub use preview::PreviewPlayer;
pub use sequencer::Sequencer;
