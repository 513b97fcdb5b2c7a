//! Error types shared across the aggregator workspace.

use thiserror::Error;

/// Result type alias for aggregator plumbing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for configuration and setup paths.
///
/// Deliberately small: the reporting and flush paths never surface errors to
/// application code, so this type only covers construction-time failures
/// (service wiring, spawning the scheduler thread, bad configuration).
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
