//! Node configuration loading.

use courier_gateway::GatewayConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the configured shared secret.
pub const API_KEY_ENV: &str = "COURIER_API_KEY";

/// Full node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Listener and access-control configuration.
    pub gateway: GatewayConfig,
    /// TLS identity material locations.
    pub identity: IdentityConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            identity: IdentityConfig::default(),
        }
    }
}

/// Where the node's certificate material lives on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Node certificate chain (PEM).
    pub cert_path: PathBuf,
    /// Node private key (PEM).
    pub key_path: PathBuf,
    /// Peer CA bundle (PEM), re-read on every trust refresh.
    pub peer_ca_path: PathBuf,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            cert_path: PathBuf::from("certs/node.crt"),
            key_path: PathBuf::from("certs/node.key"),
            peer_ca_path: PathBuf::from("certs/peer-cas.crt"),
        }
    }
}

impl NodeConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides on top of the loaded file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                self.gateway.api_key = Some(key);
            }
        }
    }

    /// Validate the assembled configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gateway
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        for (name, path) in [
            ("cert_path", &self.identity.cert_path),
            ("key_path", &self.identity.key_path),
            ("peer_ca_path", &self.identity.peer_ca_path),
        ] {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!("{name} must not be empty")));
            }
        }

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is not valid JSON for [`NodeConfig`].
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The configuration is structurally invalid.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(NodeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_round_trip_through_json() {
        let config = NodeConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: NodeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.gateway.control_addr(), config.gateway.control_addr());
        assert_eq!(parsed.identity.cert_path, config.identity.cert_path);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: NodeConfig =
            serde_json::from_str(r#"{"gateway": {"api_key": "sesame"}}"#).unwrap();
        assert_eq!(parsed.gateway.api_key.as_deref(), Some("sesame"));
        assert_eq!(parsed.gateway.control_addr().port(), 7300);
    }

    #[test]
    fn test_empty_identity_path_rejected() {
        let mut config = NodeConfig::default();
        config.identity.key_path = PathBuf::new();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
