//! Audio error types.

use thiserror::Error;

/// Audio endpoint error type.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("No default audio output device: {0}")]
    EndpointNotFound(String),

    #[error("Mixer command failed: {0}")]
    MixerCommand(String),

    #[error("Could not parse mixer output: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(windows)]
    #[error("Windows audio error: {0}")]
    Platform(#[from] windows::core::Error),
}

/// Result type for audio operations.
pub type AudioResult<T> = Result<T, AudioError>;
