//! Error types for remix-player
//!
//! Module-specific error types using thiserror for clear propagation.
//! Playback faults stay local to the sequencer (transport operations do
//! not throw across the API); these errors cover the surrounding service.

use thiserror::Error;

/// Main error type for the remix-player module
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Media resource load/play errors
    #[error("Media error: {0}")]
    Media(String),

    /// Analysis backend errors (unreachable, or returned {error})
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Outbound HTTP request errors
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Playback engine errors
    #[error("Playback error: {0}")]
    Playback(String),

    /// Malformed import data or invalid request payloads
    #[error("Validation error: {0}")]
    Validation(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Shared model errors
    #[error(transparent)]
    Common(#[from] remix_common::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using remix-player Error
pub type Result<T> = std::result::Result<T, Error>;
