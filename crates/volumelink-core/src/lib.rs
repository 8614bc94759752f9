//! Volumelink Core - Volume sampling, device matching, and the polling loop.
//!
//! This crate holds the domain types and the platform-independent logic.
//! Everything that touches the operating system (audio mixer, serial ports,
//! the terminal) is reached through the collaborator traits defined here,
//! and implemented by the `volumelink-audio`, `volumelink-serial`, and
//! `volumelink-daemon` crates.

pub mod control;
pub mod error;
pub mod identity;
pub mod level;
pub mod port;
pub mod sampler;
pub mod transport;

pub use control::{ControlLoop, KeyInput, LoopState, ESCAPE};
pub use error::{Error, Result};
pub use identity::DeviceIdentity;
pub use level::VolumeLevel;
pub use port::PortDescriptor;
pub use sampler::{AudioEndpoint, MixerReading, VolumeSampler};
pub use transport::{LinkSettings, SendOutcome, SerialBackend, TickDelivery, Transport};
