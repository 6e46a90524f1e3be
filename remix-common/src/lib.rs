//! # Remix Common Library (remix-common)
//!
//! Shared types for the Remix mixing service: the song/section/mix data
//! model, the mix interchange format, analysis result types, and the
//! event enum broadcast to connected clients.

pub mod analysis;
pub mod error;
pub mod events;
pub mod interchange;
pub mod models;

pub use error::{Error, Result};
pub use events::RemixEvent;
