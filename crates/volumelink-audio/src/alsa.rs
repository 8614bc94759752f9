//! ALSA mixer access for the default output device.
//!
//! Reads the master playback control through `amixer`. On PipeWire and
//! PulseAudio systems the ALSA `default` device is the sound server, so the
//! `Master` control there tracks the desktop's output volume and follows the
//! user's choice of output device.

use std::process::Command;

use tracing::{debug, info};
use volumelink_core::{AudioEndpoint, MixerReading};

use crate::error::{AudioError, AudioResult};

/// Master playback control of an ALSA device.
pub struct AlsaEndpoint {
    device: String,
    control: String,
}

impl AlsaEndpoint {
    /// Create an endpoint for `control` on `device` without checking it.
    #[must_use]
    pub fn new(device: String, control: String) -> Self {
        Self { device, control }
    }

    /// Create an endpoint and check that the control can be read.
    ///
    /// # Errors
    /// Returns [`AudioError::EndpointNotFound`] if the device or control
    /// does not exist, or `amixer` is not installed.
    pub fn acquire(device: String, control: String) -> AudioResult<Self> {
        let endpoint = Self::new(device, control);
        let reading = endpoint.check_control()?;
        info!(
            device = %endpoint.device,
            control = %endpoint.control,
            volume = reading.volume,
            muted = reading.muted,
            "ALSA output control found"
        );
        Ok(endpoint)
    }

    fn check_control(&self) -> AudioResult<MixerReading> {
        self.read_mixer().map_err(|e| {
            AudioError::EndpointNotFound(format!("{} control on {}: {e}", self.control, self.device))
        })
    }
}

impl AudioEndpoint for AlsaEndpoint {
    type Error = AudioError;

    /// One `amixer sget` call yields both the volume and the switch state.
    fn read_mixer(&self) -> AudioResult<MixerReading> {
        let output = Command::new("amixer")
            .args(["-D", &self.device, "sget", &self.control])
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AudioError::MixerCommand(format!("amixer failed: {}", stderr.trim())));
        }

        let reading = parse_mixer_output(&String::from_utf8_lossy(&output.stdout))?;
        debug!(volume = reading.volume, muted = reading.muted, "Mixer read");
        Ok(reading)
    }

    /// The device is looked up by name on every read, so there is nothing to
    /// re-resolve; this only checks that it is back.
    fn reacquire(&mut self) -> AudioResult<()> {
        self.check_control().map(|_| ())
    }
}

/// Parse `amixer sget` output.
///
/// Looks at the per-channel `Playback` lines, e.g.
/// `Front Left: Playback 52429 [80%] [on]`. The volume is the average over
/// all channels; the control counts as muted only if every switch is off.
///
/// # Errors
/// Returns [`AudioError::Parse`] if no playback percentage is present
/// (for example a capture-only control).
pub fn parse_mixer_output(stdout: &str) -> AudioResult<MixerReading> {
    let mut percents = Vec::new();
    let mut switches = Vec::new();

    for line in stdout.lines().filter(|l| l.contains("Playback") && l.contains('[')) {
        for part in line.split_whitespace() {
            if let Some(percent) = part.strip_prefix('[').and_then(|p| p.strip_suffix("%]"))
                && let Ok(percent) = percent.parse::<u8>()
            {
                percents.push(f32::from(percent));
            } else if part == "[on]" {
                switches.push(true);
            } else if part == "[off]" {
                switches.push(false);
            }
        }
    }

    if percents.is_empty() {
        return Err(AudioError::Parse("no playback volume in amixer output".to_string()));
    }

    #[allow(clippy::cast_precision_loss)]
    let average = percents.iter().sum::<f32>() / percents.len() as f32;
    let muted = !switches.is_empty() && switches.iter().all(|on| !on);

    Ok(MixerReading { volume: (average / 100.0).clamp(0.0, 1.0), muted })
}
