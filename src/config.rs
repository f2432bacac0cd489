use crate::commissioning::Role;
use crate::error::{Result, ZigbeeError};
use crate::zigbee::retry::RetryPolicy;
use crate::zigbee::scan::{ALL_CHANNELS_MASK, DEFAULT_SCAN_DURATION};
use crate::zigbee::zcl::MAX_NAME_LENGTH;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Load environment variables from a `.env` file in the working directory.
/// Values may contain spaces without quotes. Existing variables win.
pub fn load_dotenv() {
    let env_path = Path::new(".env");
    let Ok(content) = fs::read_to_string(env_path) else {
        return;
    };

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let mut value = value.trim();
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = &value[1..value.len() - 1];
            }

            if std::env::var(key).is_err() {
                // SAFETY: called from main before the runtime spawns any threads
                unsafe { std::env::set_var(key, value) };
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub zigbee: ZigbeeConfig,
    pub device: DeviceConfig,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZigbeeConfig {
    pub role: Role,
    /// Seconds the coordinator reopens the network for after a reboot; 0 keeps it closed.
    pub reopen_secs: u8,
    pub channel_mask: u32,
    /// Active scan duration exponent, 1..=4.
    pub scan_duration: u8,
    pub read_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub manufacturer: String,
    pub model: String,
}

impl Default for ZigbeeConfig {
    fn default() -> Self {
        Self {
            role: Role::Coordinator,
            reopen_secs: 180,
            channel_mask: ALL_CHANNELS_MASK,
            scan_duration: DEFAULT_SCAN_DURATION,
            read_timeout_ms: 10_000,
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            manufacturer: "Zigbee Core".to_string(),
            model: "Virtual Device".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            zigbee: ZigbeeConfig::default(),
            device: DeviceConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Accepts `0x`-prefixed hex or decimal.
fn parse_mask(value: &str) -> Option<u32> {
    let value = value.trim();
    match value.strip_prefix("0x").or(value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(role) = parse_env::<Role>("ZIGBEE_ROLE") {
            config.zigbee.role = role;
        }
        if let Some(secs) = parse_env("ZIGBEE_REOPEN_SECS") {
            config.zigbee.reopen_secs = secs;
        }
        if let Ok(mask) = std::env::var("ZIGBEE_CHANNEL_MASK")
            && let Some(m) = parse_mask(&mask)
        {
            config.zigbee.channel_mask = m;
        }
        if let Some(duration) = parse_env("ZIGBEE_SCAN_DURATION") {
            config.zigbee.scan_duration = duration;
        }
        if let Some(ms) = parse_env("ZIGBEE_READ_TIMEOUT_MS") {
            config.zigbee.read_timeout_ms = ms;
        }

        // Device identity
        if let Ok(manufacturer) = std::env::var("ZIGBEE_MANUFACTURER") {
            config.device.manufacturer = manufacturer;
        }
        if let Ok(model) = std::env::var("ZIGBEE_MODEL") {
            config.device.model = model;
        }

        if let Some(ms) = parse_env("ZIGBEE_RETRY_DELAY_MS") {
            config.retry.delay_ms = ms;
        }
        if let Some(max) = parse_env("ZIGBEE_RETRY_MAX_ATTEMPTS") {
            config.retry.max_attempts = Some(max);
        }

        config
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=4).contains(&self.zigbee.scan_duration) {
            return Err(ZigbeeError::InvalidConfig(format!(
                "scan_duration must be 1..=4, got {}",
                self.zigbee.scan_duration
            )));
        }
        if self.zigbee.channel_mask & ALL_CHANNELS_MASK == 0 {
            return Err(ZigbeeError::InvalidConfig(format!(
                "channel_mask 0x{:08X} selects no channel in 11..=26",
                self.zigbee.channel_mask
            )));
        }
        if self.zigbee.read_timeout_ms == 0 {
            return Err(ZigbeeError::InvalidConfig("read_timeout_ms must be positive".into()));
        }
        if self.retry.delay_ms == 0 {
            return Err(ZigbeeError::InvalidConfig("retry delay_ms must be positive".into()));
        }
        for (name, value) in [
            ("manufacturer", &self.device.manufacturer),
            ("model", &self.device.model),
        ] {
            if value.len() > MAX_NAME_LENGTH {
                return Err(ZigbeeError::InvalidConfig(format!(
                    "{} is {} bytes (max {})",
                    name,
                    value.len(),
                    MAX_NAME_LENGTH
                )));
            }
        }
        Ok(())
    }
}
