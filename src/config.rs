//! Bridge configuration.
//!
//! Read from the JSON options file the add-on supervisor writes. Every
//! field has a default so a missing or unreadable file still yields a
//! runnable configuration pointed at the usual addresses.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Options file written by the add-on supervisor.
pub const DEFAULT_OPTIONS_PATH: &str = "/data/options.json";

/// Runtime configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// MQTT broker host or IP, without scheme.
    pub mqtt_broker_url: String,
    pub mqtt_port: u16,
    pub mqtt_username: String,
    pub mqtt_password: String,
    /// Leading segment of every state and command topic.
    pub mqtt_topic_prefix: String,
    /// EW11 gateway on the wallpad control bus.
    pub ew11_host: String,
    pub ew11_port: u16,
    /// Optional second gateway carrying utility metering records.
    pub metering_host: Option<String>,
    pub metering_port: Option<u16>,
    /// Where discovery bookkeeping is persisted across restarts.
    pub state_path: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            mqtt_broker_url: "192.168.0.34".to_string(),
            mqtt_port: 1883,
            mqtt_username: "dev".to_string(),
            mqtt_password: "password".to_string(),
            mqtt_topic_prefix: "devcommax".to_string(),
            ew11_host: "192.168.0.37".to_string(),
            ew11_port: 8899,
            metering_host: None,
            metering_port: None,
            state_path: "/share/commax_ew11_state.json".to_string(),
        }
    }
}

impl BridgeConfig {
    /// Read configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Read configuration, falling back to defaults when the file is
    /// missing or broken.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::from_file(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    "Failed to load {}, using defaults: {}",
                    path.as_ref().display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Metering gateway address, when one is configured. The port
    /// defaults to the usual EW11 port.
    pub fn metering_gateway(&self) -> Option<(&str, u16)> {
        self.metering_host
            .as_deref()
            .map(|host| (host, self.metering_port.unwrap_or(8899)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.mqtt_broker_url, "192.168.0.34");
        assert_eq!(config.mqtt_port, 1883);
        assert_eq!(config.mqtt_topic_prefix, "devcommax");
        assert_eq!(config.ew11_host, "192.168.0.37");
        assert_eq!(config.ew11_port, 8899);
        assert_eq!(config.metering_gateway(), None);
        assert_eq!(config.state_path, "/share/commax_ew11_state.json");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let json = r#"{"mqtt_broker_url": "10.0.0.2", "ew11_port": 9000}"#;
        let config: BridgeConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.mqtt_broker_url, "10.0.0.2");
        assert_eq!(config.ew11_port, 9000);
        assert_eq!(config.mqtt_port, 1883);
        assert_eq!(config.ew11_host, "192.168.0.37");
    }

    #[test]
    fn test_from_file_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = r#"{
            "mqtt_broker_url": "broker.local",
            "mqtt_port": 1884,
            "mqtt_username": "bridge",
            "mqtt_password": "secret",
            "mqtt_topic_prefix": "home",
            "ew11_host": "10.0.0.5",
            "ew11_port": 8899,
            "metering_host": "10.0.0.6"
        }"#;
        file.write_all(json.as_bytes()).unwrap();

        let config = BridgeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.mqtt_broker_url, "broker.local");
        assert_eq!(config.mqtt_topic_prefix, "home");
        assert_eq!(config.metering_gateway(), Some(("10.0.0.6", 8899)));
    }

    #[test]
    fn test_metering_port_override() {
        let json = r#"{"metering_host": "10.0.0.6", "metering_port": 8900}"#;
        let config: BridgeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.metering_gateway(), Some(("10.0.0.6", 8900)));
    }

    #[test]
    fn test_load_or_default_with_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig::load_or_default(dir.path().join("nope.json"));
        assert_eq!(config.mqtt_broker_url, "192.168.0.34");
    }

    #[test]
    fn test_load_or_default_with_corrupt_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{not json").unwrap();

        let config = BridgeConfig::load_or_default(file.path());
        assert_eq!(config.ew11_port, 8899);
    }
}
