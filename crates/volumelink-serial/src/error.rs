//! Serial error types.

use thiserror::Error;

/// Serial port error type.
#[derive(Debug, Error)]
pub enum SerialError {
    #[error("Port enumeration failed: {0}")]
    Enumeration(#[source] serialport::Error),

    #[error("Failed to open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
}

/// Result type for serial operations.
pub type SerialResult<T> = Result<T, SerialError>;
