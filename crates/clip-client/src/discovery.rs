//! First-contact discovery.
//!
//! ```text
//! Unverified --secure GET ok------------------------------> Verified
//!     |
//!     +--certificate untrusted--> InsecureProbe --GET ok + chain captured--> Pinned
//!     |                               |
//!     |                               +--fails--> original secure error
//!     +--any other failure--> error
//! ```
//!
//! Each phase owns exactly one client. The insecure client is built only on
//! entry to `InsecureProbe` and dropped when discovery returns, so it can
//! never carry a signed request. Discovery has no side effects; the caller
//! commits the result to a [`TrustStore`](shared_auth::TrustStore).

use serde::Deserialize;
use shared_auth::{PinnedCertificate, Salt, PROTOCOL_VERSION};
use tracing::{debug, info, warn};

use crate::config::{with_default_port, Timeouts};
use crate::errors::{DiscoveryError, TransportError};
use crate::pem::encode_certificates;
use crate::tls::{InsecureTls, TrustedTransport, VerifyingTls};

/// Where a discovery run ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryPhase {
    /// Nothing attempted yet.
    Unverified,
    /// Secure probe rejected the certificate; probing without verification.
    InsecureProbe,
    /// Secure probe succeeded. No pin.
    Verified,
    /// Insecure probe succeeded and the peer chain was captured.
    Pinned,
}

impl DiscoveryPhase {
    /// Legal transitions only. Once pinned, discovery never goes back to
    /// secure mode.
    fn advance(self, to: DiscoveryPhase) -> DiscoveryPhase {
        use DiscoveryPhase::*;
        debug_assert!(
            matches!(
                (self, to),
                (Unverified, Verified) | (Unverified, InsecureProbe) | (InsecureProbe, Pinned)
            ),
            "illegal discovery transition {self:?} -> {to:?}"
        );
        debug!(from = ?self, to = ?to, "Discovery phase");
        to
    }
}

/// Wire body of `GET /`.
#[derive(Debug, Deserialize)]
struct InfoResponse {
    version: u32,
    salt: String,
}

impl InfoResponse {
    fn decode(body: &[u8]) -> Result<Salt, DiscoveryError> {
        let info: InfoResponse =
            serde_json::from_slice(body).map_err(|e| DiscoveryError::Format(e.to_string()))?;
        if info.version != PROTOCOL_VERSION {
            return Err(DiscoveryError::Format(format!(
                "unsupported version {}",
                info.version
            )));
        }
        Salt::from_base64(&info.salt).map_err(|e| DiscoveryError::Format(format!("salt: {e}")))
    }
}

/// Outcome of a successful discovery.
#[derive(Debug, Clone)]
pub struct DiscoveryResult {
    pub salt: Salt,
    /// Present only if the insecure fallback ran.
    pub pinned: Option<PinnedCertificate>,
    pub phase: DiscoveryPhase,
}

/// One-shot discovery against a single server address.
#[derive(Debug)]
pub struct Discoverer {
    server_addr: String,
    verifying: VerifyingTls,
    timeouts: Timeouts,
}

impl Discoverer {
    /// `verifying` decides what counts as trusted in the secure probe:
    /// platform roots plus any extra roots it was built with.
    pub fn new(server_addr: &str, verifying: VerifyingTls, timeouts: Timeouts) -> Self {
        Self {
            server_addr: with_default_port(server_addr),
            verifying,
            timeouts,
        }
    }

    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }

    fn url(&self) -> String {
        format!("https://{}/", self.server_addr)
    }

    pub async fn discover(&self) -> Result<DiscoveryResult, DiscoveryError> {
        let phase = DiscoveryPhase::Unverified;
        info!(server = %self.server_addr, "Starting discovery");

        let secure = self.verifying.http_client(&self.timeouts)?;
        let secure_err = match fetch(&secure, &self.url()).await {
            Ok(body) => {
                let salt = InfoResponse::decode(&body)?;
                return Ok(DiscoveryResult {
                    salt,
                    pinned: None,
                    phase: phase.advance(DiscoveryPhase::Verified),
                });
            }
            Err(err @ TransportError::UntrustedCertificate(_)) => err,
            Err(err) => return Err(err.into()),
        };

        let phase = phase.advance(DiscoveryPhase::InsecureProbe);
        debug!(server = %self.server_addr, error = %secure_err, "Certificate not trusted, probing without verification");

        let insecure = InsecureTls::new()?;
        let body = match fetch(&insecure.probe_client(&self.timeouts)?, &self.url()).await {
            Ok(body) => body,
            Err(err) => {
                debug!(error = %err, "Insecure probe failed");
                return Err(secure_err.into());
            }
        };
        let salt = InfoResponse::decode(&body)?;

        let chain = insecure
            .capture_chain(&self.server_addr, self.timeouts.connect)
            .await?;
        let pinned = PinnedCertificate::from_pem(encode_certificates(&chain)).ok_or_else(|| {
            TransportError::Tls("server presented no certificates".into())
        })?;

        warn!(
            server = %self.server_addr,
            certificates = pinned.block_count(),
            "Pinning a certificate that could not be verified. Anyone intercepting this \
             first connection could have supplied it; compare it out of band if in doubt"
        );

        Ok(DiscoveryResult {
            salt,
            pinned: Some(pinned),
            phase: phase.advance(DiscoveryPhase::Pinned),
        })
    }
}

async fn fetch(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, TransportError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| TransportError::from_reqwest(&e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::Http(format!("discovery returned HTTP {status}")));
    }
    let body = response
        .bytes()
        .await
        .map_err(|e| TransportError::from_reqwest(&e))?;
    Ok(body.to_vec())
}
