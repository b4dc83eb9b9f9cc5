use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::protocol::OUTPUT_REGISTER_BASE;

/// One output channel binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Holding register address driving this channel.
    pub register_address: u16,
    /// Sysfs GPIO `value` path (e.g. `/sys/class/gpio/gpio2/value`).
    /// `None` means the channel runs on the in-memory backend.
    #[serde(default)]
    pub gpio_value_path: Option<String>,
}

/// Loop timing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingParams {
    /// Serial read timeout / output sync tick interval in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Pause after a servicing error in milliseconds.
    #[serde(default = "default_error_recovery_delay_ms")]
    pub error_recovery_delay_ms: u64,
}

fn default_tick_interval_ms() -> u64 {
    10
}

fn default_error_recovery_delay_ms() -> u64 {
    300
}

impl Default for TimingParams {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            error_recovery_delay_ms: default_error_recovery_delay_ms(),
        }
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceBootConfig {
    /// Serial port name.
    pub port_name: String,
    /// Baud rate (framing is fixed at 8N1).
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Modbus unit ID (slave address).
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,
    #[serde(default)]
    pub timing: TimingParams,
    /// Output channels, in channel order.
    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelConfig>,
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_unit_id() -> u8 {
    1
}

fn default_channels() -> Vec<ChannelConfig> {
    (0..2)
        .map(|i| ChannelConfig {
            register_address: OUTPUT_REGISTER_BASE + i,
            gpio_value_path: None,
        })
        .collect()
}

impl DeviceBootConfig {
    /// Parse configuration from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Read configuration from a file.
    pub fn from_file(file_path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read config file {file_path}"))?;
        Self::from_json(&content).with_context(|| format!("Failed to parse config {file_path}"))
    }

    /// Convert to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Default configuration for a given port.
    pub fn for_port(port_name: &str) -> Self {
        Self {
            port_name: port_name.to_string(),
            baud_rate: default_baud_rate(),
            unit_id: default_unit_id(),
            timing: TimingParams::default(),
            channels: default_channels(),
        }
    }
}
