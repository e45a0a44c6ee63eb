//! Recorder error taxonomy
//!
//! Every per-event handler returns one of these; the session manager logs it
//! at the event boundary and carries on with other channels.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecorderError {
    /// Missing or malformed configuration, fatal at startup
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage credentials missing or unusable; uploads will fail
    #[error("Credential error: {0}")]
    Credential(String),

    /// The capture sink failed to start or stop
    #[error("Capture error: {0}")]
    Capture(String),

    /// No text channel to notify; recording is not started
    #[error("No text channel found for voice channel {0}")]
    Resolution(String),

    /// The object storage call failed; the local file is kept
    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RecorderError>;
