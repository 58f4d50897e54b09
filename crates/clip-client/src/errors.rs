//! Client-side error types.
//!
//! Every failure surfaces as a value; nothing here retries on its own.

use std::error::Error as StdError;
use thiserror::Error;

use shared_auth::{FileIdError, SecretError};

/// Network, DNS or TLS failures unrelated to request authentication.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection refused, DNS failure, route failure.
    #[error("server unreachable: {0}")]
    Unreachable(String),

    /// Server certificate not trusted by the active verifier. The only
    /// failure that lets discovery fall back to pinning.
    #[error("untrusted server certificate: {0}")]
    UntrustedCertificate(String),

    /// Any other handshake failure.
    #[error("TLS failure: {0}")]
    Tls(String),

    /// Connect or request deadline exceeded.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Any other HTTP-level transport failure.
    #[error("HTTP transport failure: {0}")]
    Http(String),

    /// TLS or HTTP client could not be constructed.
    #[error("client configuration error: {0}")]
    Config(String),
}

impl TransportError {
    /// Classify a reqwest failure without losing its cause chain.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        let detail = error_chain(err);
        if is_certificate_failure(err) {
            TransportError::UntrustedCertificate(detail)
        } else if is_tls_failure(err) {
            TransportError::Tls(detail)
        } else if err.is_timeout() {
            TransportError::Timeout(detail)
        } else if err.is_connect() {
            TransportError::Unreachable(detail)
        } else {
            TransportError::Http(detail)
        }
    }

    /// Classify a raw socket or handshake failure.
    pub fn from_io(err: &std::io::Error) -> Self {
        let detail = error_chain(err);
        if is_certificate_failure(err) {
            TransportError::UntrustedCertificate(detail)
        } else if is_tls_failure(err) || err.kind() == std::io::ErrorKind::InvalidData {
            TransportError::Tls(detail)
        } else if err.kind() == std::io::ErrorKind::TimedOut {
            TransportError::Timeout(detail)
        } else {
            TransportError::Unreachable(detail)
        }
    }
}

/// Failure of a discovery attempt. No partial trust survives either variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    /// Body is not `{"version": 1, "salt": "<base64>"}`.
    #[error("invalid discovery response: {0}")]
    Format(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Tri-state request outcome minus the `Ok` arm.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Server answered 401. The server never says which check failed.
    #[error("unauthorized: check the passphrase for this server")]
    Unauthorized,

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Server answered with another non-success status.
    #[error("server returned HTTP {status}")]
    Status { status: u16 },

    #[error(transparent)]
    InvalidFileId(#[from] FileIdError),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error(transparent)]
    Pin(#[from] PinError),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Problems reading or writing a pin file.
#[derive(Debug, Error)]
pub enum PinError {
    #[error("pin file io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no CERTIFICATE blocks found in {0}")]
    NoCertificates(String),
}

/// True if any cause in the chain is a certificate rejection by rustls.
pub fn is_certificate_failure(err: &(dyn StdError + 'static)) -> bool {
    find_tls_error(err).is_some_and(|tls| {
        matches!(
            tls,
            rustls::Error::InvalidCertificate(_) | rustls::Error::NoCertificatesPresented
        )
    })
}

/// True if any cause in the chain is a rustls error.
pub fn is_tls_failure(err: &(dyn StdError + 'static)) -> bool {
    find_tls_error(err).is_some()
}

// `io::Error` hides its payload from `source()`, so wrapped payloads are
// unpacked explicitly with `get_ref`.
fn find_tls_error<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a rustls::Error> {
    let mut current: Option<&'a (dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(tls) = e.downcast_ref::<rustls::Error>() {
            return Some(tls);
        }
        if let Some(inner) = e.downcast_ref::<std::io::Error>().and_then(|io| io.get_ref()) {
            if let Some(tls) = find_tls_error(inner) {
                return Some(tls);
            }
        }
        current = e.source();
    }
    None
}

/// Render an error and all its causes as `outer: inner: root`.
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut current = err.source();
    while let Some(e) = current {
        let msg = e.to_string();
        if !out.contains(&msg) {
            out.push_str(": ");
            out.push_str(&msg);
        }
        current = e.source();
    }
    out
}
