//! Volumelink Daemon - Mirrors the output volume onto the knob display.
//!
//! This is the entry point for the `volumelink` binary. It samples the
//! default output device's volume every tick and writes it, as a single
//! byte, to every attached display. Press Esc (or send SIGTERM) to stop.

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod keyboard;
mod signals;

use config::{Config, ConfigSource};
use keyboard::Keyboard;
use volumelink_core::{ControlLoop, Transport, VolumeSampler};
use volumelink_serial::SerialPortBackend;

fn main() -> Result<()> {
    // Load configuration first so the log level can come from it
    let (config, source) = config::load_config()?;

    init_logging(&config)?;
    info!(version = env!("CARGO_PKG_VERSION"), "Starting Volumelink");

    match &source {
        ConfigSource::File(path) => info!(?path, "Configuration loaded"),
        ConfigSource::Defaults(path) => info!(?path, "Config file not found, using defaults"),
    }

    let target = config.device.identity()?;

    // Acquire the default output device once; without one there is nothing to mirror
    let endpoint = volumelink_audio::open_default_endpoint(&config.audio.mixer_settings())
        .context("No default audio output device")?;
    let sampler = VolumeSampler::new(endpoint);
    let level = sampler.sample().context("Failed to read output volume")?;
    info!(%level, "Current output volume");

    let transport = Transport::new(SerialPortBackend::new(), config.device.link_settings())
        .skip_unchanged(config.device.skip_unchanged);

    let keys = Keyboard::open().context("Failed to set up keyboard input")?;
    let stop = signals::register_stop_flag()?;

    if keys.is_attached() {
        info!("Running. Press Esc to exit.");
    } else {
        info!("Running without a terminal. Send SIGTERM to exit.");
    }

    let mut control = ControlLoop::new(sampler, transport, keys, target, config.poll.interval())
        .with_stop_flag(stop);
    control.run();

    // Dropping the loop restores the terminal
    drop(control);
    info!("Volumelink stopped");
    Ok(())
}

/// Initialize logging to stderr. `RUST_LOG` directives are combined with the
/// configured level for Volumelink's own crates.
fn init_logging(config: &Config) -> Result<()> {
    let level = &config.daemon.log_level;
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("volumelink={level}").parse()?)
                .add_directive(format!("volumelink_core={level}").parse()?)
                .add_directive(format!("volumelink_audio={level}").parse()?)
                .add_directive(format!("volumelink_serial={level}").parse()?),
        )
        .init();
    Ok(())
}
