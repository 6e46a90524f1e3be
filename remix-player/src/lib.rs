//! # Remix Player Library (remix-player)
//!
//! Mix playback microservice: drives an ordered list of (song, interval)
//! pairs through a single owned media output as one continuous experience,
//! with an independent preview resource, section derivation from analysis
//! results, a SQLite-backed mix store, and an HTTP/SSE control interface.

pub mod analysis;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod library;
pub mod playback;
pub mod state;

pub use error::{Error, Result};
pub use state::SharedState;
