//! Volumelink Audio - Default output device volume.
//!
//! Provides the [`AudioEndpoint`](volumelink_core::AudioEndpoint)
//! implementation for the host platform:
//! - Unix: the ALSA `Master` playback control, read through `amixer`
//! - Windows: the Core Audio endpoint volume of the default render device

#[cfg(unix)]
pub mod alsa;
pub mod error;
#[cfg(windows)]
pub mod wasapi;

pub use error::{AudioError, AudioResult};

/// ALSA device used when none is configured.
pub const DEFAULT_MIXER_DEVICE: &str = "default";
/// ALSA control used when none is configured.
pub const DEFAULT_MIXER_CONTROL: &str = "Master";

/// The endpoint type for this platform.
#[cfg(unix)]
pub type SystemEndpoint = alsa::AlsaEndpoint;
/// The endpoint type for this platform.
#[cfg(windows)]
pub type SystemEndpoint = wasapi::CoreAudioEndpoint;

/// Which mixer to read. Only meaningful for ALSA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixerSettings {
    pub device: String,
    pub control: String,
}

impl Default for MixerSettings {
    fn default() -> Self {
        Self { device: DEFAULT_MIXER_DEVICE.to_string(), control: DEFAULT_MIXER_CONTROL.to_string() }
    }
}

/// Acquire the default output device.
///
/// # Errors
/// Returns [`AudioError::EndpointNotFound`] if there is no usable output device.
#[cfg(unix)]
pub fn open_default_endpoint(settings: &MixerSettings) -> AudioResult<SystemEndpoint> {
    alsa::AlsaEndpoint::acquire(settings.device.clone(), settings.control.clone())
}

/// Acquire the default output device.
///
/// # Errors
/// Returns [`AudioError::EndpointNotFound`] if there is no usable output device.
#[cfg(windows)]
pub fn open_default_endpoint(_settings: &MixerSettings) -> AudioResult<SystemEndpoint> {
    wasapi::CoreAudioEndpoint::acquire()
}
