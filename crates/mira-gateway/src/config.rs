//! Gateway configuration loading.
//!
//! A gateway is described by a small YAML document selecting the transport
//! and its settings:
//!
//! ```yaml
//! transport:
//!   type: serial
//!   port: /dev/ttyACM0
//!   baudrate: 1000000
//! ```
//!
//! ```yaml
//! transport:
//!   type: mqtt
//!   host: broker.example.org
//!   port: 1883
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adapter::GatewayAdapter;
use crate::mqtt::{MqttAdapter, MqttConfig};
use crate::serial::{SerialAdapter, SerialConfig};

/// Errors raised while loading a gateway configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a valid gateway configuration.
    #[error("failed to parse configuration file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Which transport connects this gateway to the swarm.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportConfig {
    /// Serial-attached gateway board.
    Serial(SerialConfig),
    /// MQTT broker relay.
    Mqtt(MqttConfig),
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Transport used to reach the swarm.
    pub transport: TransportConfig,
}

impl GatewayConfig {
    /// Load a configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Build the adapter this configuration describes.
    pub fn build_adapter(&self) -> Box<dyn GatewayAdapter> {
        match &self.transport {
            TransportConfig::Serial(config) => Box::new(SerialAdapter::new(config.clone())),
            TransportConfig::Mqtt(config) => Box::new(MqttAdapter::new(config.clone())),
        }
    }
}
