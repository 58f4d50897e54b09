//! Client-side trust bundle.
//!
//! A [`TrustStore`] is assembled exactly once, from the result of discovery
//! plus the operator's passphrase, and is read-only afterwards. Persisting it
//! is the configuration layer's job.

use std::fmt;
use std::time::Duration;

use crate::authenticator::Authenticator;
use crate::clock::TimeSource;
use crate::secret::{Salt, SharedSecret};
use crate::signer::Signer;

/// PEM certificate chain captured during an insecure discovery probe.
///
/// Trusted for the one server address it was captured from, and never as a
/// general certificate authority.
#[derive(Clone, PartialEq, Eq)]
pub struct PinnedCertificate {
    pem: String,
}

impl PinnedCertificate {
    /// Wrap PEM text. Returns `None` for blank input so an empty pin can
    /// never masquerade as a real one.
    pub fn from_pem(pem: impl Into<String>) -> Option<Self> {
        let pem = pem.into();
        if pem.trim().is_empty() {
            None
        } else {
            Some(Self { pem })
        }
    }

    pub fn as_pem(&self) -> &str {
        &self.pem
    }

    /// Number of `CERTIFICATE` blocks in the chain.
    pub fn block_count(&self) -> usize {
        self.pem.matches("-----BEGIN CERTIFICATE-----").count()
    }
}

impl fmt::Debug for PinnedCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinnedCertificate")
            .field("blocks", &self.block_count())
            .finish()
    }
}

/// Everything a client knows about one server.
#[derive(Debug, Clone)]
pub struct TrustStore {
    server_addr: String,
    secret: SharedSecret,
    salt: Salt,
    pinned: Option<PinnedCertificate>,
}

impl TrustStore {
    pub fn new(
        server_addr: impl Into<String>,
        secret: SharedSecret,
        salt: Salt,
        pinned: Option<PinnedCertificate>,
    ) -> Self {
        Self {
            server_addr: server_addr.into(),
            secret,
            salt,
            pinned,
        }
    }

    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }

    pub fn secret(&self) -> &SharedSecret {
        &self.secret
    }

    pub fn salt(&self) -> &Salt {
        &self.salt
    }

    pub fn pinned_certificate(&self) -> Option<&PinnedCertificate> {
        self.pinned.as_ref()
    }

    /// A signer over this store's secret.
    pub fn signer<T: TimeSource>(&self, clock: T) -> Signer<T> {
        Signer::new(self.secret.clone(), clock)
    }

    /// An authenticator over this store's secret.
    pub fn authenticator(&self, max_request_age: Duration) -> Authenticator {
        Authenticator::new(self.secret.clone(), max_request_age)
    }
}
