//! Volumelink Serial - USB serial port discovery and one-shot writes.
//!
//! Implements [`SerialBackend`](volumelink_core::SerialBackend) on top of the
//! `serialport` crate. Ports are opened 8-N-1 with no flow control.

pub mod backend;
pub mod error;

pub use backend::SerialPortBackend;
pub use error::{SerialError, SerialResult};
