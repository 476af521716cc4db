// src/config.rs

//! Poller configuration, read from a YAML file.
//!
//! ```yaml
//! bus: /dev/i2c-1
//! interval_secs: 5
//! sensors:
//!   - driver: mcp9808
//!     name: bread-board
//!     address: 0x18
//!   - driver: shtc3
//!     mode: low-power
//! ```

use crate::common::timing::DEFAULT_POLL_INTERVAL;
use crate::common::BusAddress;
use crate::sensor::shtc3::{self, MeasurementMode};
use core::fmt;
use core::time::Duration;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("interval_secs must be greater than zero")]
    InvalidInterval,

    #[error("{sensor}: invalid I2C address {address:#04x}")]
    InvalidAddress { sensor: String, address: u8 },

    #[error("{sensor}: {driver} only answers on {expected}")]
    FixedAddress {
        sensor: String,
        driver: DriverKind,
        expected: BusAddress,
    },

    #[error("{sensor}: {driver} needs an address")]
    MissingAddress { sensor: String, driver: DriverKind },

    #[error("{sensor}: option `{option}` does not apply to {driver}")]
    UnexpectedOption {
        sensor: String,
        driver: DriverKind,
        option: &'static str,
    },

    #[error("sensor name `{0}` is used more than once")]
    DuplicateName(String),
}

/// Chip family of a configured sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Mcp9808,
    Hih6030,
    Shtc3,
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DriverKind::Mcp9808 => "mcp9808",
            DriverKind::Hih6030 => "hih6030",
            DriverKind::Shtc3 => "shtc3",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensorConfig {
    pub driver: DriverKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<u8>,
    #[serde(default)]
    pub mode: Option<MeasurementMode>,
}

impl SensorConfig {
    /// Name to report this entry under before a driver exists for it.
    pub fn label(&self) -> String {
        match (&self.name, self.address) {
            (Some(name), _) => name.clone(),
            (None, Some(address)) => format!("{}-{:#04x}", self.driver, address),
            (None, None) => self.driver.to_string(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let sensor = self.label();

        if let Some(address) = self.address {
            if BusAddress::new(address).is_err() {
                return Err(ConfigError::InvalidAddress { sensor, address });
            }
        }

        match self.driver {
            DriverKind::Mcp9808 if self.address.is_none() => Err(ConfigError::MissingAddress {
                sensor,
                driver: self.driver,
            }),
            DriverKind::Shtc3 => match self.address {
                Some(address) if address != shtc3::ADDRESS.as_u8() => {
                    Err(ConfigError::FixedAddress {
                        sensor,
                        driver: self.driver,
                        expected: shtc3::ADDRESS,
                    })
                }
                _ => Ok(()),
            },
            _ if self.mode.is_some() => Err(ConfigError::UnexpectedOption {
                sensor,
                driver: self.driver,
                option: "mode",
            }),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PollerConfig {
    /// Bus device node.
    pub bus: PathBuf,
    pub interval_secs: u64,
    /// Snapshot the sensors of a cycle on separate threads.
    pub parallel: bool,
    pub sensors: Vec<SensorConfig>,
}

impl Default for PollerConfig {
    /// One SHTC3 called "chamber" on `/dev/i2c-1`, polled every 5 s.
    fn default() -> Self {
        PollerConfig {
            bus: PathBuf::from("/dev/i2c-1"),
            interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            parallel: false,
            sensors: vec![SensorConfig {
                driver: DriverKind::Shtc3,
                name: Some("chamber".into()),
                address: None,
                mode: None,
            }],
        }
    }
}

impl PollerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let config = Self::from_yaml_str(&text)?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parses and validates.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: PollerConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::InvalidInterval);
        }

        let mut names = HashSet::new();
        for sensor in &self.sensors {
            sensor.validate()?;
            if let Some(name) = &sensor.name {
                if !names.insert(name.as_str()) {
                    return Err(ConfigError::DuplicateName(name.clone()));
                }
            }
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
