//! Error types shared across the chime workspace.

use thiserror::Error;

/// Main error type for chime-common
#[derive(Error, Debug)]
pub enum Error {
    /// Settings file loading or parsing errors
    #[error("Settings error: {0}")]
    Settings(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using chime-common Error
pub type Result<T> = std::result::Result<T, Error>;
