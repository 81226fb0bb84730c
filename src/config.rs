//! Configuration loading with fallback defaults
//!
//! The config is a JSON file beside the executable (see
//! [`crate::startup::StartupContext`]). If it does not exist, a default one
//! is written out and used as-is, so a first run leaves an editable file
//! behind. The record is read once at startup and never mutated.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Error, Result};

/// Sentinel value for `serialPort` requesting auto-discovery
pub const AUTO_PORT: &str = "auto";

/// Bridge configuration, stored with camelCase keys on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Explicit endpoint identifier, or `"auto"` to discover by description
    pub serial_port: String,
    /// Substring matched against port descriptions when auto-discovering
    pub serial_name: String,
    pub baud_rate: u32,
    /// Index `i` is the OSC address for event code `i`
    pub osc_addresses: Vec<String>,
    pub osc_host: String,
    pub osc_port: u16,
    /// Hardware id handed to the driver-control helper
    pub arduino_driver: String,
}

impl Config {
    /// Documented fallback configuration, written on first run
    pub fn default_config() -> Self {
        Config {
            serial_port: AUTO_PORT.to_string(),
            serial_name: "USB".to_string(),
            baud_rate: 9600,
            osc_addresses: vec![
                "/restart".to_string(),
                "/stop".to_string(),
                "/light".to_string(),
            ],
            osc_host: "127.0.0.1".to_string(),
            osc_port: 8010,
            arduino_driver: "USB\\VID_1A86&PID_7523".to_string(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.baud_rate == 0 {
            return Err(Error::Config("baudRate must be a positive integer".into()));
        }
        if self.osc_addresses.is_empty() {
            return Err(Error::Config(
                "oscAddresses must contain at least one address".into(),
            ));
        }
        Ok(())
    }
}

/// Load the config file, creating it with defaults if absent
pub fn load_or_create(path: &Path) -> Result<Config> {
    if !path.exists() {
        info!("Config file {} does not exist, writing defaults", path.display());
        let config = Config::default_config();
        let json = serde_json::to_string_pretty(&config)
            .map_err(|e| Error::Config(format!("failed to serialize defaults: {e}")))?;
        std::fs::write(path, json)?;
        return Ok(config);
    }

    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}
