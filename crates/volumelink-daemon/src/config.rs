//! Daemon configuration.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;
use volumelink_audio::MixerSettings;
use volumelink_core::control::DEFAULT_INTERVAL;
use volumelink_core::transport::{DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT};
use volumelink_core::{DeviceIdentity, LinkSettings};

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Daemon settings
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Display device settings
    #[serde(default)]
    pub device: DeviceConfig,
    /// Polling settings
    #[serde(default)]
    pub poll: PollConfig,
    /// Audio settings
    #[serde(default)]
    pub audio: AudioConfig,
}

/// Daemon-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self { log_level: default_log_level() }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Display device settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// USB Vendor ID
    #[serde(default = "default_vid")]
    pub vendor_id: String,
    /// USB Product ID
    #[serde(default = "default_pid")]
    pub product_id: String,
    /// Serial baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Open/write timeout in milliseconds
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
    /// Don't resend a level the display already has
    #[serde(default)]
    pub skip_unchanged: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            vendor_id: default_vid(),
            product_id: default_pid(),
            baud_rate: default_baud_rate(),
            write_timeout_ms: default_write_timeout_ms(),
            skip_unchanged: false,
        }
    }
}

impl DeviceConfig {
    /// The configured USB identity.
    ///
    /// # Errors
    /// Returns an error if either id is not valid hex.
    pub fn identity(&self) -> Result<DeviceIdentity> {
        DeviceIdentity::from_hex(&self.vendor_id, &self.product_id)
            .context("Invalid [device] vendor_id/product_id")
    }

    #[must_use]
    pub fn link_settings(&self) -> LinkSettings {
        LinkSettings {
            baud_rate: self.baud_rate,
            timeout: Duration::from_millis(self.write_timeout_ms),
        }
    }
}

fn default_vid() -> String {
    "0483".to_string()
}

fn default_pid() -> String {
    "5750".to_string()
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_write_timeout_ms() -> u64 {
    u64::try_from(DEFAULT_TIMEOUT.as_millis()).unwrap_or(50)
}

/// Polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Time between ticks in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval_ms: default_interval_ms() }
    }
}

impl PollConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_interval_ms() -> u64 {
    u64::try_from(DEFAULT_INTERVAL.as_millis()).unwrap_or(100)
}

/// Audio settings. Only used with ALSA.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// ALSA device name
    #[serde(default = "default_mixer_device")]
    pub mixer_device: String,
    /// ALSA simple mixer control
    #[serde(default = "default_mixer_control")]
    pub mixer_control: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self { mixer_device: default_mixer_device(), mixer_control: default_mixer_control() }
    }
}

impl AudioConfig {
    #[must_use]
    pub fn mixer_settings(&self) -> MixerSettings {
        MixerSettings { device: self.mixer_device.clone(), control: self.mixer_control.clone() }
    }
}

fn default_mixer_device() -> String {
    volumelink_audio::DEFAULT_MIXER_DEVICE.to_string()
}

fn default_mixer_control() -> String {
    volumelink_audio::DEFAULT_MIXER_CONTROL.to_string()
}

impl Config {
    /// Check values that parse but cannot work.
    ///
    /// # Errors
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        LevelFilter::from_str(&self.daemon.log_level)
            .with_context(|| format!("Invalid [daemon] log_level: {:?}", self.daemon.log_level))?;
        self.device.identity()?;
        if self.device.baud_rate == 0 {
            bail!("Invalid [device] baud_rate: must be greater than 0");
        }
        if self.poll.interval_ms == 0 {
            bail!("Invalid [poll] interval_ms: must be greater than 0");
        }
        Ok(())
    }
}

/// Where the configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Read from this file
    File(PathBuf),
    /// No file at this path; defaults used
    Defaults(PathBuf),
}

/// Load configuration from the user's config directory, or defaults.
pub fn load_config() -> Result<(Config, ConfigSource)> {
    let config_path = config_path()?;
    load_config_from(&config_path)
}

/// Load configuration from `path`, or defaults if it does not exist.
pub fn load_config_from(path: &Path) -> Result<(Config, ConfigSource)> {
    if !path.exists() {
        return Ok((Config::default(), ConfigSource::Defaults(path.to_path_buf())));
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {path:?}"))?;
    let config: Config =
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {path:?}"))?;
    config.validate().with_context(|| format!("Invalid config file: {path:?}"))?;

    Ok((config, ConfigSource::File(path.to_path_buf())))
}

/// Get the configuration file path.
fn config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "volumelink", "Volumelink")
        .context("Could not determine config directory")?;
    Ok(dirs.config_dir().join("config.toml"))
}
