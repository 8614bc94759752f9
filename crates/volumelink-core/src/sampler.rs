//! Volume sampling from the OS audio mixer.

use crate::level::VolumeLevel;

/// One reading of the output device's master control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixerReading {
    /// Master volume as a fraction in 0.0 - 1.0, independent of mute
    pub volume: f32,
    /// Whether the output is muted
    pub muted: bool,
}

/// The default audio output device, as exposed by the OS mixer.
///
/// Implementations are read-only: the mixer is polled, never changed.
#[cfg_attr(test, mockall::automock(type Error = std::io::Error;))]
pub trait AudioEndpoint {
    /// Error raised by the underlying audio API.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read master volume and mute state together.
    ///
    /// # Errors
    /// Returns an error if the mixer cannot be queried.
    fn read_mixer(&self) -> Result<MixerReading, Self::Error>;

    /// Re-resolve the default output device after it went away.
    ///
    /// # Errors
    /// Returns an error if no default output device exists any more.
    fn reacquire(&mut self) -> Result<(), Self::Error>;
}

/// Turns mixer readings into [`VolumeLevel`]s.
pub struct VolumeSampler<E> {
    endpoint: E,
}

impl<E: AudioEndpoint> VolumeSampler<E> {
    /// Wrap an already acquired endpoint.
    #[must_use]
    pub fn new(endpoint: E) -> Self {
        Self { endpoint }
    }

    /// Sample the current level: 0 when muted, otherwise the rounded
    /// master volume percentage. The mixer is read once per sample.
    ///
    /// # Errors
    /// Propagates the endpoint's error if the read fails.
    pub fn sample(&self) -> Result<VolumeLevel, E::Error> {
        let reading = self.endpoint.read_mixer()?;
        Ok(VolumeLevel::from_scalar(reading.volume, reading.muted))
    }

    /// Re-resolve the endpoint. See [`AudioEndpoint::reacquire`].
    ///
    /// # Errors
    /// Propagates the endpoint's error.
    pub fn reacquire(&mut self) -> Result<(), E::Error> {
        self.endpoint.reacquire()
    }
}
