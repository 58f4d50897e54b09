//! Client configuration file.
//!
//! One TOML file per server, written by `join` and read by every later
//! command.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared_auth::serde_helpers::humantime_serde;
use shared_auth::{write_private, Salt, SharedSecret, TrustStore};
use thiserror::Error;

use crate::errors::ClientError;
use crate::pin_file::PinFile;

/// Port used when the address carries none.
pub const DEFAULT_PORT: u16 = 2586;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config encode error: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Connection deadlines for every client this crate builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            request: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// `host[:port]` of the server.
    pub server_addr: String,

    /// Base64 shared secret. Absent until `join` has run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Base64 salt learned during discovery.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,

    /// PEM file holding the pinned chain, if discovery pinned one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_file: Option<PathBuf>,

    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let timeouts = Timeouts::default();
        Self {
            server_addr: String::new(),
            key: None,
            salt: None,
            cert_file: None,
            connect_timeout: timeouts.connect,
            request_timeout: timeouts.request,
        }
    }
}

impl ClientConfig {
    pub fn new(server_addr: impl AsRef<str>) -> Self {
        Self {
            server_addr: with_default_port(server_addr.as_ref()),
            ..Self::default()
        }
    }

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

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_addr.trim().is_empty() {
            return Err(ConfigError::Invalid("server_addr must be set".into()));
        }
        if self.connect_timeout.is_zero() || self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid("timeouts must be non-zero".into()));
        }
        self.secret()?;
        if let Some(salt) = &self.salt {
            Salt::from_base64(salt).map_err(|e| ConfigError::Invalid(format!("salt: {e}")))?;
        }
        Ok(())
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            connect: self.connect_timeout,
            request: self.request_timeout,
        }
    }

    /// Decoded shared secret, if the file has one.
    pub fn secret(&self) -> Result<Option<SharedSecret>, ConfigError> {
        self.key
            .as_deref()
            .map(SharedSecret::from_base64)
            .transpose()
            .map_err(|e| ConfigError::Invalid(format!("key: {e}")))
    }

    /// Rebuild the trust bundle `join` recorded. The PEM at `cert_file`,
    /// if any, becomes the pinned certificate.
    pub fn trust_store(&self) -> Result<TrustStore, ClientError> {
        let secret = self
            .secret()?
            .ok_or_else(|| ConfigError::Invalid("no key configured; run join first".into()))?;
        let salt = self
            .salt
            .as_deref()
            .ok_or_else(|| ConfigError::Invalid("no salt configured; run join first".into()))
            .and_then(|s| {
                Salt::from_base64(s).map_err(|e| ConfigError::Invalid(format!("salt: {e}")))
            })?;
        let pinned = match &self.cert_file {
            Some(path) => Some(PinFile::new(path).load()?),
            None => None,
        };
        Ok(TrustStore::new(&self.server_addr, secret, salt, pinned))
    }
}

/// Append [`DEFAULT_PORT`] unless the address already names a port.
pub fn with_default_port(addr: &str) -> String {
    let addr = addr.trim();
    let has_port = if let Some(rest) = addr.strip_prefix('[') {
        rest.split_once(']')
            .map(|(_, tail)| tail.starts_with(':'))
            .unwrap_or(false)
    } else {
        addr.matches(':').count() == 1
    };
    if has_port {
        addr.to_string()
    } else if addr.contains(':') && !addr.starts_with('[') {
        format!("[{addr}]:{DEFAULT_PORT}")
    } else {
        format!("{addr}:{DEFAULT_PORT}")
    }
}

/// Host component of `host:port`, with IPv6 brackets removed.
pub fn host_part(addr: &str) -> &str {
    if let Some(rest) = addr.strip_prefix('[') {
        return rest.split_once(']').map(|(h, _)| h).unwrap_or(rest);
    }
    match addr.rsplit_once(':') {
        Some((host, _)) if !host.contains(':') => host,
        _ => addr,
    }
}
