//! Error types for Volumelink core.

use thiserror::Error;

/// Core error type for Volumelink operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid volume value: {0} (must be 0-100)")]
    InvalidVolume(u32),

    #[error("Invalid USB id: {0:?} (expected 4 hex digits, e.g. 0483)")]
    InvalidUsbId(String),
}

/// Result type alias for Volumelink core operations.
pub type Result<T> = std::result::Result<T, Error>;
