// On-disk JSON configuration shared by both binaries.
//
// A missing file yields the defaults; a present-but-malformed file is a
// startup failure. Unknown fields are ignored so newer config files keep
// working with older binaries.

use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FenceError;

/// Default location of the config file, relative to the working directory.
pub const DEFAULT_PATH: &str = "data/config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub interfaces: InterfaceConfig,
    pub dns: DnsConfig,
    pub web: WebConfig,
}

/// NIC names: the physical interface the inspector binds and the secondary
/// (veth) interface the monitor reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceConfig {
    pub physical: String,
    pub veth: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsConfig {
    pub blocklist: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub listen: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interfaces: InterfaceConfig::default(),
            dns: DnsConfig::default(),
            web: WebConfig::default(),
        }
    }
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self {
            physical: "eth0".to_string(),
            veth: "kidos".to_string(),
        }
    }
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self { blocklist: Vec::new() }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen: ":8080".to_string(),
        }
    }
}

impl Config {
    /// Read config from `path`, falling back to defaults if the file does
    /// not exist. Any other I/O or parse failure is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Config, FenceError> {
        let path = path.as_ref();
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Config::default()),
            Err(e) => {
                return Err(FenceError::Config(format!(
                    "read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        serde_json::from_str(&data)
            .map_err(|e| FenceError::Config(format!("parse {}: {}", path.display(), e)))
    }

    /// Write config to `path` as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), FenceError> {
        let path = path.as_ref();
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| FenceError::Config(format!("serialize config: {}", e)))?;
        std::fs::write(path, data)
            .map_err(|e| FenceError::Config(format!("write {}: {}", path.display(), e)))
    }
}
