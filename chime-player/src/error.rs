//! Error types for chime-player.
//!
//! Module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for the chime-player daemon
#[derive(Error, Debug)]
pub enum Error {
    /// Settings loading errors
    #[error("Settings error: {0}")]
    Settings(#[from] chime_common::Error),

    /// Weather endpoint errors
    #[error("Weather fetch error: {0}")]
    WeatherFetch(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Track loading/decoding errors
    #[error("Track load error: {0}")]
    TrackLoad(String),

    /// Playback engine errors
    #[error("Playback error: {0}")]
    Playback(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using chime-player Error
pub type Result<T> = std::result::Result<T, Error>;
