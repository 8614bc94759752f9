//! Core Audio endpoint volume for the default Windows render device.

#![allow(unsafe_code)]

use tracing::{debug, info};
use volumelink_core::{AudioEndpoint, MixerReading};
use windows::Win32::Media::Audio::Endpoints::IAudioEndpointVolume;
use windows::Win32::Media::Audio::{IMMDeviceEnumerator, MMDeviceEnumerator, eConsole, eRender};
use windows::Win32::System::Com::{CLSCTX_ALL, COINIT_MULTITHREADED, CoCreateInstance, CoInitializeEx};

use crate::error::{AudioError, AudioResult};

/// Volume interface of the default console render endpoint.
///
/// The endpoint is resolved once; [`AudioEndpoint::reacquire`] resolves it
/// again, which picks up a changed default device.
pub struct CoreAudioEndpoint {
    volume: IAudioEndpointVolume,
}

impl CoreAudioEndpoint {
    /// Resolve the default render endpoint.
    ///
    /// # Errors
    /// Returns [`AudioError::EndpointNotFound`] if there is no output device.
    pub fn acquire() -> AudioResult<Self> {
        let volume = default_endpoint_volume()?;
        info!("Default Windows output device found");
        Ok(Self { volume })
    }
}

fn default_endpoint_volume() -> AudioResult<IAudioEndpointVolume> {
    // SAFETY: plain COM calls on this thread; the interfaces returned are
    // reference counted and released on drop.
    unsafe {
        CoInitializeEx(None, COINIT_MULTITHREADED).ok()?;
        let enumerator: IMMDeviceEnumerator = CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)?;
        let device = enumerator
            .GetDefaultAudioEndpoint(eRender, eConsole)
            .map_err(|e| AudioError::EndpointNotFound(e.message()))?;
        Ok(device.Activate::<IAudioEndpointVolume>(CLSCTX_ALL, None)?)
    }
}

impl AudioEndpoint for CoreAudioEndpoint {
    type Error = AudioError;

    fn read_mixer(&self) -> AudioResult<MixerReading> {
        // SAFETY: `volume` is a live interface owned by `self`.
        let (volume, muted) =
            unsafe { (self.volume.GetMasterVolumeLevelScalar()?, self.volume.GetMute()?) };
        Ok(MixerReading { volume, muted: muted.as_bool() })
    }

    fn reacquire(&mut self) -> AudioResult<()> {
        self.volume = default_endpoint_volume()?;
        debug!("Default Windows output device re-resolved");
        Ok(())
    }
}
