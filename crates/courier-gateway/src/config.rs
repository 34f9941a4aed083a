//! Gateway configuration with validation.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Main gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Internal control listener (trusted network, plain TCP).
    pub control: ListenerConfig,
    /// External peer listener (mutual TLS).
    pub peer: ListenerConfig,
    /// Shared secret for control-API and delegate-upgrade admission.
    ///
    /// `None` means permissive mode: every request is authorized. The
    /// runtime logs a startup warning so the default is never silent.
    pub api_key: Option<String>,
    /// Request validation limits.
    pub limits: LimitsConfig,
    /// Shutdown behavior.
    pub shutdown: ShutdownConfig,
    /// Documentation path, exempt from the access gate. The root path
    /// redirects here.
    pub docs_path: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            control: ListenerConfig {
                host: IpAddr::V4(Ipv4Addr::LOCALHOST),
                port: 7300,
            },
            peer: ListenerConfig {
                host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
                port: 7400,
            },
            api_key: None,
            limits: LimitsConfig::default(),
            shutdown: ShutdownConfig::default(),
            docs_path: "/docs".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.control.port != 0 && self.control.port == self.peer.port {
            return Err(ConfigError::DuplicatePorts);
        }

        if self.limits.max_body_bytes == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_body_bytes cannot be 0".into(),
            ));
        }

        if self.shutdown.close_deadline_secs == 0 {
            return Err(ConfigError::InvalidTimeout(
                "close_deadline_secs cannot be 0".into(),
            ));
        }

        if !self.docs_path.starts_with('/') {
            return Err(ConfigError::Invalid(
                "docs_path must start with '/'".into(),
            ));
        }

        Ok(())
    }

    /// Get control listener bind address.
    pub fn control_addr(&self) -> SocketAddr {
        SocketAddr::new(self.control.host, self.control.port)
    }

    /// Get peer listener bind address.
    pub fn peer_addr(&self) -> SocketAddr {
        SocketAddr::new(self.peer.host, self.peer.port)
    }

    /// Deadline applied to each surface close during shutdown.
    pub fn shutdown_deadline(&self) -> Duration {
        Duration::from_secs(self.shutdown.close_deadline_secs)
    }
}

/// A single listener's bind address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    pub host: IpAddr,
    pub port: u16,
}

/// Request limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Max request body size in bytes on the control listener.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Shutdown configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Seconds to wait for each surface to confirm closure before it is
    /// force-terminated.
    pub close_deadline_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            close_deadline_secs: 10,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Both listeners configured on the same port.
    #[error("duplicate ports configured")]
    DuplicatePorts,
    /// Invalid size or count limit.
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid timeout value.
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// General configuration error.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
