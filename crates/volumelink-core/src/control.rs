//! The polling loop tying sampler and transport together.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::identity::DeviceIdentity;
use crate::sampler::{AudioEndpoint, VolumeSampler};
use crate::transport::{SerialBackend, TickDelivery, Transport};

/// Key code that stops the loop (ASCII escape).
pub const ESCAPE: u8 = 27;

/// Default time between ticks.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// Unbuffered keyboard input from the controlling terminal.
#[cfg_attr(test, mockall::automock)]
pub trait KeyInput {
    /// Whether a key press is waiting. Must not block.
    ///
    /// # Errors
    /// Returns an error if the terminal cannot be polled.
    fn key_pending(&mut self) -> std::io::Result<bool>;

    /// Consume one pending key and return its character code.
    ///
    /// # Errors
    /// Returns an error if the terminal cannot be read.
    fn read_key(&mut self) -> std::io::Result<u8>;
}

/// State of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    /// Ticking
    #[default]
    Running,
    /// Cancelled; terminal
    Stopped,
}

/// Samples the output volume every tick and forwards it to the display.
pub struct ControlLoop<E, B, K> {
    sampler: VolumeSampler<E>,
    transport: Transport<B>,
    keys: K,
    target: DeviceIdentity,
    interval: Duration,
    stop: Arc<AtomicBool>,
    state: LoopState,
}

impl<E, B, K> ControlLoop<E, B, K>
where
    E: AudioEndpoint,
    B: SerialBackend,
    K: KeyInput,
{
    /// Build a loop in the `Running` state.
    #[must_use]
    pub fn new(
        sampler: VolumeSampler<E>,
        transport: Transport<B>,
        keys: K,
        target: DeviceIdentity,
        interval: Duration,
    ) -> Self {
        Self {
            sampler,
            transport,
            keys,
            target,
            interval,
            stop: Arc::new(AtomicBool::new(false)),
            state: LoopState::Running,
        }
    }

    /// Also stop when `flag` becomes true (set from a signal handler).
    #[must_use]
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = flag;
        self
    }

    #[must_use]
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Tick until cancelled.
    pub fn run(&mut self) {
        info!(device = %self.target, interval = ?self.interval, "Polling started");

        while self.state == LoopState::Running {
            thread::sleep(self.interval);
            self.tick();
        }

        info!("Polling stopped");
    }

    /// Run one tick: sample, deliver, then check for cancellation.
    ///
    /// Returns the delivery report, or `None` if the loop is stopped or the
    /// volume could not be sampled.
    pub fn tick(&mut self) -> Option<TickDelivery> {
        if self.state == LoopState::Stopped {
            return None;
        }
        if self.stop.load(Ordering::Relaxed) {
            self.stop_loop("termination signal");
            return None;
        }

        let delivery = match self.sampler.sample() {
            Ok(level) => Some(self.transport.poll_and_send(level, self.target)),
            Err(e) => {
                warn!(error = %e, "Failed to sample output volume");
                if let Err(e) = self.sampler.reacquire() {
                    warn!(error = %e, "No default output device");
                }
                None
            }
        };

        self.check_cancel();
        delivery
    }

    fn check_cancel(&mut self) {
        if self.stop.load(Ordering::Relaxed) {
            self.stop_loop("termination signal");
            return;
        }

        loop {
            match self.keys.key_pending() {
                Ok(true) => {}
                Ok(false) => return,
                Err(e) => {
                    warn!(error = %e, "Failed to poll keyboard");
                    return;
                }
            }

            match self.keys.read_key() {
                Ok(ESCAPE) => {
                    self.stop_loop("escape pressed");
                    return;
                }
                Ok(code) => debug!(code, "Ignoring key"),
                Err(e) => {
                    warn!(error = %e, "Failed to read keyboard");
                    return;
                }
            }
        }
    }

    fn stop_loop(&mut self, reason: &str) {
        info!(reason, "Stopping");
        self.state = LoopState::Stopped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::VolumeLevel;
    use crate::port::PortDescriptor;
    use crate::sampler::{MixerReading, MockAudioEndpoint};
    use crate::transport::LinkSettings;
    use crate::transport::fake::FakeBackend;

    fn display_backend() -> FakeBackend {
        FakeBackend::with_ports(vec![
            PortDescriptor::usb("COM3", 0x0483, 0x1234),
            PortDescriptor::usb("COM5", 0x0483, 0x5750),
        ])
    }

    fn steady_endpoint(volume: f32, muted: bool) -> MockAudioEndpoint {
        let mut endpoint = MockAudioEndpoint::new();
        endpoint.expect_read_mixer().returning(move || Ok(MixerReading { volume, muted }));
        endpoint
    }

    fn quiet_keys() -> MockKeyInput {
        let mut keys = MockKeyInput::new();
        keys.expect_key_pending().returning(|| Ok(false));
        keys
    }

    /// Keyboard that yields `codes` on the first check, then nothing.
    fn keys_pressing(codes: Vec<u8>) -> MockKeyInput {
        let mut keys = MockKeyInput::new();
        let mut pending = codes.clone().into_iter();
        let mut presses = codes.into_iter();
        keys.expect_key_pending().returning(move || Ok(pending.next().is_some()));
        keys.expect_read_key().returning(move || Ok(presses.next().unwrap_or(0)));
        keys
    }

    fn build<K: KeyInput>(
        endpoint: MockAudioEndpoint,
        backend: FakeBackend,
        keys: K,
    ) -> ControlLoop<MockAudioEndpoint, FakeBackend, K> {
        ControlLoop::new(
            VolumeSampler::new(endpoint),
            Transport::new(backend, LinkSettings::default()),
            keys,
            DeviceIdentity::default(),
            Duration::ZERO,
        )
    }

    #[test]
    fn test_tick_sends_sampled_level_to_matching_port() {
        let mut control = build(steady_endpoint(0.58, false), display_backend(), quiet_keys());

        let delivery = control.tick().expect("sampled");

        assert_eq!(delivery.delivered(), 1);
        assert_eq!(control.transport.backend().writes(), vec![("COM5".to_string(), vec![58])]);
        assert_eq!(control.state(), LoopState::Running);
    }

    #[test]
    fn test_muted_output_sends_zero() {
        let mut control = build(steady_endpoint(0.9, true), display_backend(), quiet_keys());

        control.tick();

        assert_eq!(control.transport.backend().writes(), vec![("COM5".to_string(), vec![0])]);
    }

    #[test]
    fn test_escape_stops_and_nothing_runs_afterwards() {
        let mut endpoint = MockAudioEndpoint::new();
        endpoint
            .expect_read_mixer()
            .times(1)
            .returning(|| Ok(MixerReading { volume: 0.5, muted: false }));
        let mut control = build(endpoint, display_backend(), keys_pressing(vec![ESCAPE]));

        control.tick();
        assert_eq!(control.state(), LoopState::Stopped);

        assert!(control.tick().is_none());
        assert_eq!(control.transport.backend().journal.enumerations.get(), 1);
    }

    #[test]
    fn test_run_returns_after_escape() {
        let mut endpoint = MockAudioEndpoint::new();
        endpoint
            .expect_read_mixer()
            .times(1)
            .returning(|| Ok(MixerReading { volume: 0.25, muted: false }));
        let mut control = build(endpoint, display_backend(), keys_pressing(vec![ESCAPE]));

        control.run();

        assert_eq!(control.state(), LoopState::Stopped);
        assert_eq!(control.transport.backend().writes(), vec![("COM5".to_string(), vec![25])]);
    }

    #[test]
    fn test_other_keys_are_ignored() {
        let mut control =
            build(steady_endpoint(0.5, false), display_backend(), keys_pressing(vec![b'q', b'\n']));

        control.tick();
        control.tick();

        assert_eq!(control.state(), LoopState::Running);
        assert_eq!(control.transport.backend().writes().len(), 2);
    }

    #[test]
    fn test_escape_behind_other_keys_still_stops() {
        let mut control =
            build(steady_endpoint(0.5, false), display_backend(), keys_pressing(vec![b'a', ESCAPE]));

        control.tick();

        assert_eq!(control.state(), LoopState::Stopped);
    }

    #[test]
    fn test_stop_flag_prevents_sampling() {
        let mut endpoint = MockAudioEndpoint::new();
        endpoint.expect_read_mixer().never();
        let flag = Arc::new(AtomicBool::new(true));
        let mut control =
            build(endpoint, display_backend(), quiet_keys()).with_stop_flag(Arc::clone(&flag));

        control.run();

        assert_eq!(control.state(), LoopState::Stopped);
        assert_eq!(control.transport.backend().journal.enumerations.get(), 0);
    }

    #[test]
    fn test_sampling_failure_skips_tick_and_reacquires() {
        let mut endpoint = MockAudioEndpoint::new();
        endpoint
            .expect_read_mixer()
            .returning(|| Err(std::io::Error::other("endpoint invalidated")));
        endpoint.expect_reacquire().times(1).returning(|| Ok(()));
        let mut control = build(endpoint, display_backend(), quiet_keys());

        assert!(control.tick().is_none());
        assert_eq!(control.state(), LoopState::Running);
        assert!(control.transport.backend().journal.opens.borrow().is_empty());
    }

    #[test]
    fn test_keyboard_error_does_not_stop_loop() {
        let mut keys = MockKeyInput::new();
        keys.expect_key_pending().returning(|| Err(std::io::Error::other("tty gone")));
        let mut control = build(steady_endpoint(0.5, false), display_backend(), keys);

        control.tick();
        control.tick();

        assert_eq!(control.state(), LoopState::Running);
    }

    #[test]
    fn test_unchanged_volume_repeats_identical_writes() {
        let mut control = build(steady_endpoint(0.33, false), display_backend(), quiet_keys());

        for _ in 0..4 {
            control.tick();
        }

        let expected = VolumeLevel::new(33).unwrap().to_byte();
        assert_eq!(control.transport.backend().writes(), vec![("COM5".to_string(), vec![expected]); 4]);
    }
}
