//! Client configuration, loaded from YAML.
//!
//! ```yaml
//! protocol_version: v5
//! fetch_timeout_ms: 2000
//! advertisement_key: "00112233445566778899aabbccddeeff"
//! dedup_window: 64
//! validation_tolerance_secs: 120
//! ```
//!
//! Every field is optional.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use station_packet::{hex_to_bytes, BlockCipher};
use station_protocol::ProtocolVersion;

use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StationConfig {
    /// Version to use without asking the station.
    pub protocol_version: Option<ProtocolVersion>,
    /// Per-step request timeout.
    pub fetch_timeout_ms: u64,
    /// Hex key for background broadcasts.
    pub advertisement_key: Option<String>,
    /// Recent advertisement payloads remembered for de-duplication.
    pub dedup_window: usize,
    /// Allowed distance between a background broadcast's time and now.
    pub validation_tolerance_secs: u64,
}

impl Default for StationConfig {
    fn default() -> Self {
        StationConfig {
            protocol_version: None,
            fetch_timeout_ms: 5000,
            advertisement_key: None,
            dedup_window: 64,
            validation_tolerance_secs: station_packet::service_data::DEFAULT_VALIDATION_TOLERANCE_SECS,
        }
    }
}

impl StationConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ClientError> {
        serde_yaml::from_str(yaml).map_err(|e| ClientError::Config(e.to_string()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&yaml)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Decode the configured advertisement key.
    pub fn advertisement_key(&self) -> Result<Option<BlockCipher>, ClientError> {
        match &self.advertisement_key {
            None => Ok(None),
            Some(text) => {
                let bytes = hex_to_bytes(text)?;
                Ok(Some(BlockCipher::from_slice(&bytes)?))
            }
        }
    }
}
