//! Gateway configuration
//!
//! Read from a YAML file, then overridden by command-line flags and
//! `NSGATE_*` environment variables (see [`crate::cli::Args::apply`]).

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_WARMUP_SECS: u64 = 15;
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 10;
pub const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONFLICT_STATUS: u16 = 400;

/// Default config file location: ~/.nsgate/config.yaml
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".nsgate")
        .join("config.yaml")
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("port must not be 0")]
    ZeroPort,

    #[error("{0} must be greater than 0")]
    ZeroDuration(&'static str),

    #[error("conflict_status must be 400 or 409, got {0}")]
    InvalidConflictStatus(u16),
}

/// Settings for one gateway process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Address the HTTP listener binds to
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Seconds before the readiness probe turns positive
    pub warmup_secs: u64,
    /// Seconds in-flight requests get after a shutdown signal
    pub shutdown_grace_secs: u64,
    /// Upper bound on a single cluster API call, in seconds
    pub gateway_timeout_secs: u64,
    /// Status for creating a namespace that already exists (400 or 409)
    pub conflict_status: u16,
    /// Kubeconfig to use instead of in-cluster / default discovery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,
    /// Serve from an in-process cluster instead of a real one
    pub in_memory: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            warmup_secs: DEFAULT_WARMUP_SECS,
            shutdown_grace_secs: DEFAULT_SHUTDOWN_GRACE_SECS,
            gateway_timeout_secs: DEFAULT_GATEWAY_TIMEOUT_SECS,
            conflict_status: DEFAULT_CONFLICT_STATUS,
            kubeconfig: None,
            in_memory: false,
        }
    }
}

impl GatewayConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_secs(self.warmup_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }

    /// Conflict status as an HTTP status. Only meaningful after [`validate`].
    pub fn conflict_status(&self) -> StatusCode {
        StatusCode::from_u16(self.conflict_status).unwrap_or(StatusCode::BAD_REQUEST)
    }
}

// ============================================================================
// Pure parsing and validation
// ============================================================================

/// Parse a YAML document. Missing fields take their defaults.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    if content.trim().is_empty() {
        return Ok(GatewayConfig::default());
    }
    Ok(serde_yaml::from_str(content)?)
}

pub fn validate(config: &GatewayConfig) -> Result<(), ConfigError> {
    if config.port == 0 {
        return Err(ConfigError::ZeroPort);
    }

    for (field, value) in [
        ("warmup_secs", config.warmup_secs),
        ("shutdown_grace_secs", config.shutdown_grace_secs),
        ("gateway_timeout_secs", config.gateway_timeout_secs),
    ] {
        if value == 0 {
            return Err(ConfigError::ZeroDuration(field));
        }
    }

    if !matches!(config.conflict_status, 400 | 409) {
        return Err(ConfigError::InvalidConflictStatus(config.conflict_status));
    }

    Ok(())
}

// ============================================================================
// I/O wrapper
// ============================================================================

/// Load the config file at `path`.
///
/// With an explicit path the file must exist. Without one, the default
/// location is tried and a missing file yields the defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    match path {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            parse_config(&std::fs::read_to_string(path)?)
        }
        None => {
            let path = default_config_path();
            if path.exists() {
                parse_config(&std::fs::read_to_string(path)?)
            } else {
                Ok(GatewayConfig::default())
            }
        }
    }
}
