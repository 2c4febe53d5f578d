//! Configuration management

use crate::hid::protocol::{DeviceSignature, PACKET_SIZE};
use crate::hid::worker::{WorkerTiming, DEFAULT_QUEUE_CAPACITY};
use crate::pad::model::SensorLimits;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// HID device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// USB Vendor ID
    #[serde(default = "default_vendor_id")]
    pub vendor_id: u16,
    /// USB Product ID
    #[serde(default = "default_product_id")]
    pub product_id: u16,
    /// Interrupt IN endpoint address
    #[serde(default = "default_read_endpoint")]
    pub read_endpoint: u8,
    /// Interrupt OUT endpoint address
    #[serde(default = "default_write_endpoint")]
    pub write_endpoint: u8,
    #[serde(default = "default_packet_size")]
    pub packet_size: usize,
}

fn default_vendor_id() -> u16 {
    DeviceSignature::REFLEX_V2.vendor_id
}
fn default_product_id() -> u16 {
    DeviceSignature::REFLEX_V2.product_id
}
fn default_read_endpoint() -> u8 {
    DeviceSignature::REFLEX_V2.read_endpoint
}
fn default_write_endpoint() -> u8 {
    DeviceSignature::REFLEX_V2.write_endpoint
}
fn default_packet_size() -> usize {
    PACKET_SIZE
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            vendor_id: default_vendor_id(),
            product_id: default_product_id(),
            read_endpoint: default_read_endpoint(),
            write_endpoint: default_write_endpoint(),
            packet_size: default_packet_size(),
        }
    }
}

impl From<&DeviceConfig> for DeviceSignature {
    fn from(config: &DeviceConfig) -> Self {
        Self {
            vendor_id: config.vendor_id,
            product_id: config.product_id,
            read_endpoint: config.read_endpoint,
            write_endpoint: config.write_endpoint,
            packet_size: config.packet_size,
        }
    }
}

/// Worker and data-loop timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Reader timeout per HID read call
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
    /// Writer wait on an empty queue
    #[serde(default = "default_write_idle")]
    pub write_idle_us: u64,
    /// Router wait for an inbound message before pumping
    #[serde(default = "default_router_poll")]
    pub router_poll_ms: u64,
    /// Depth of each endpoint queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_read_timeout() -> u64 {
    1
}
fn default_write_idle() -> u64 {
    500
}
fn default_router_poll() -> u64 {
    1
}
fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: default_read_timeout(),
            write_idle_us: default_write_idle(),
            router_poll_ms: default_router_poll(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl TimingConfig {
    pub fn router_poll(&self) -> Duration {
        Duration::from_millis(self.router_poll_ms)
    }
}

impl From<&TimingConfig> for WorkerTiming {
    fn from(config: &TimingConfig) -> Self {
        Self {
            read_timeout: Duration::from_millis(config.read_timeout_ms),
            write_idle: Duration::from_micros(config.write_idle_us),
            queue_capacity: config.queue_capacity,
        }
    }
}

/// Default sensor limits applied on reset and to new profiles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    #[serde(default = "default_threshold")]
    pub threshold: u8,
    #[serde(default = "default_hysteresis")]
    pub hysteresis: u8,
}

fn default_threshold() -> u8 {
    SensorLimits::default().threshold
}
fn default_hysteresis() -> u8 {
    SensorLimits::default().hysteresis
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            hysteresis: default_hysteresis(),
        }
    }
}

impl From<&SensorConfig> for SensorLimits {
    fn from(config: &SensorConfig) -> Self {
        Self {
            threshold: config.threshold,
            hysteresis: config.hysteresis,
        }
    }
}

/// Profile store location
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilesConfig {
    /// Directory holding `profiles.json`; the platform data dir when unset
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub sensors: SensorConfig,
    #[serde(default)]
    pub profiles: ProfilesConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
            Self::parse(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))
        } else {
            // Return default config if file doesn't exist
            Ok(Config::default())
        }
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "reflex", "ReflexPad")
            .context("Failed to determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Get the default configuration embedded in the binary
    pub fn default_config_str() -> &'static str {
        include_str!("../../config/default.toml")
    }

    pub fn signature(&self) -> DeviceSignature {
        DeviceSignature::from(&self.device)
    }

    pub fn worker_timing(&self) -> WorkerTiming {
        WorkerTiming::from(&self.timing)
    }

    pub fn sensor_limits(&self) -> SensorLimits {
        SensorLimits::from(&self.sensors)
    }
}
