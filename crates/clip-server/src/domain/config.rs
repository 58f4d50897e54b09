//! Server configuration with validation.
//!
//! Written once by `clipshare setup`, read by `clipshare serve`.

use serde::{Deserialize, Serialize};
use shared_auth::serde_helpers::humantime_serde;
use shared_auth::{write_private, Salt, SecretError, SharedSecret, DEFAULT_MAX_REQUEST_AGE};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Port the server listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 2586;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub listen_addr: SocketAddr,
    /// Advertised `host:port`, used by the install script. Optional.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_addr: Option<String>,
    /// Directory clips are stored in
    pub cache_dir: PathBuf,
    /// PEM certificate chain
    pub cert_file: PathBuf,
    /// PEM private key
    pub key_file: PathBuf,
    /// Base64 shared secret
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Base64 salt served by discovery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    /// Freshness window for signed requests
    #[serde(with = "humantime_serde")]
    pub max_request_age: Duration,
    /// Per-connection TLS handshake deadline
    #[serde(with = "humantime_serde")]
    pub handshake_timeout: Duration,
    /// Largest accepted clip, in bytes
    pub max_clip_size: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            server_addr: None,
            cache_dir: PathBuf::from("/var/cache/clipshare"),
            cert_file: PathBuf::from("/etc/clipshare/server.crt"),
            key_file: PathBuf::from("/etc/clipshare/server.key"),
            key: None,
            salt: None,
            max_request_age: DEFAULT_MAX_REQUEST_AGE,
            handshake_timeout: Duration::from_secs(10),
            max_clip_size: 32 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        // Holds the shared secret.
        write_private(path, toml::to_string_pretty(self)?.as_bytes())?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.secret()?;
        self.salt()?;

        if self.max_request_age.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "max_request_age",
                reason: "cannot be 0".into(),
            });
        }

        if self.handshake_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "handshake_timeout",
                reason: "cannot be 0".into(),
            });
        }

        if self.max_clip_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_clip_size",
                reason: "cannot be 0".into(),
            });
        }

        if let Some(addr) = &self.server_addr {
            if addr.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "server_addr",
                    reason: "cannot be blank when set".into(),
                });
            }
        }

        Ok(())
    }

    pub fn secret(&self) -> Result<SharedSecret, ConfigError> {
        let key = self.key.as_deref().ok_or(ConfigError::MissingField("key"))?;
        SharedSecret::from_base64(key).map_err(|e| ConfigError::secret("key", e))
    }

    pub fn salt(&self) -> Result<Salt, ConfigError> {
        let salt = self.salt.as_deref().ok_or(ConfigError::MissingField("salt"))?;
        Salt::from_base64(salt).map_err(|e| ConfigError::secret("salt", e))
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config encode error: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ConfigError {
    fn secret(field: &'static str, err: SecretError) -> Self {
        ConfigError::InvalidValue {
            field,
            reason: err.to_string(),
        }
    }
}
