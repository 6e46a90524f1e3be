//! Common error types for Remix

use thiserror::Error;

/// Common result type for Remix operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared across Remix crates
#[derive(Error, Debug)]
pub enum Error {
    /// Interval bounds violate the owning section
    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    /// Imported or constructed data failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
