//! TLS capability objects.
//!
//! Three distinct client configurations, never one client with a mutable
//! verification flag:
//!
//! - [`VerifyingTls`]: platform roots plus operator-supplied roots
//! - [`InsecureTls`]: accepts any certificate; discovery probe only
//! - [`PinnedTls`]: accepts the pinned chain, else falls back to roots
//!
//! Only the verifying and pinned variants implement [`TrustedTransport`], so
//! an insecure client cannot be handed to anything that sends a secret.

use std::sync::Arc;
use std::time::Duration;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{CertificateError, DigitallySignedStruct, RootCertStore, SignatureScheme};
use subtle::ConstantTimeEq;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

use crate::config::{host_part, Timeouts};
use crate::errors::TransportError;

fn provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

fn config_error(err: impl std::fmt::Display) -> TransportError {
    TransportError::Config(err.to_string())
}

/// Platform trust roots plus `extra`.
fn root_store(extra: &[CertificateDer<'static>]) -> RootCertStore {
    let mut roots = RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for err in &native.errors {
        debug!(error = %err, "Skipping unreadable platform certificate");
    }
    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    let (extra_added, extra_ignored) = roots.add_parsable_certificates(extra.iter().cloned());
    if extra_ignored > 0 {
        warn!(ignored = extra_ignored, "Some extra root certificates could not be parsed");
    }
    debug!(
        native = added,
        native_ignored = ignored,
        extra = extra_added,
        "Loaded trust roots"
    );
    roots
}

fn build_http_client(
    config: &rustls::ClientConfig,
    timeouts: &Timeouts,
) -> Result<reqwest::Client, TransportError> {
    reqwest::Client::builder()
        .use_preconfigured_tls(config.clone())
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.request)
        .build()
        .map_err(|e| TransportError::Config(crate::errors::error_chain(&e)))
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::VerifyingTls {}
    impl Sealed for super::PinnedTls {}
}

/// A TLS configuration that authenticates the server.
pub trait TrustedTransport: sealed::Sealed + Send + Sync {
    fn rustls_config(&self) -> &rustls::ClientConfig;

    fn http_client(&self, timeouts: &Timeouts) -> Result<reqwest::Client, TransportError> {
        build_http_client(self.rustls_config(), timeouts)
    }
}

// =============================================================================
// VERIFYING
// =============================================================================

/// Standard WebPKI verification.
#[derive(Debug, Clone)]
pub struct VerifyingTls {
    config: Arc<rustls::ClientConfig>,
}

impl VerifyingTls {
    pub fn new(extra_roots: &[CertificateDer<'static>]) -> Result<Self, TransportError> {
        let config = rustls::ClientConfig::builder_with_provider(provider())
            .with_safe_default_protocol_versions()
            .map_err(config_error)?
            .with_root_certificates(root_store(extra_roots))
            .with_no_client_auth();
        Ok(Self {
            config: Arc::new(config),
        })
    }
}

impl TrustedTransport for VerifyingTls {
    fn rustls_config(&self) -> &rustls::ClientConfig {
        &self.config
    }
}

// =============================================================================
// INSECURE (DISCOVERY ONLY)
// =============================================================================

/// Accepts any certificate. Handshake signatures are still checked so the
/// captured chain at least belongs to the peer that completed the handshake.
#[derive(Debug)]
struct AcceptAnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Non-verifying TLS for the discovery fallback.
#[derive(Debug, Clone)]
pub struct InsecureTls {
    config: Arc<rustls::ClientConfig>,
}

impl InsecureTls {
    pub fn new() -> Result<Self, TransportError> {
        let provider = provider();
        let config = rustls::ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(config_error)?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate { provider }))
            .with_no_client_auth();
        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// HTTP client for the insecure discovery request. Deliberately not a
    /// [`TrustedTransport`].
    pub fn probe_client(&self, timeouts: &Timeouts) -> Result<reqwest::Client, TransportError> {
        build_http_client(&self.config, timeouts)
    }

    /// Complete a handshake with `addr` and return the presented chain,
    /// leaf first.
    pub async fn capture_chain(
        &self,
        addr: &str,
        timeout: Duration,
    ) -> Result<Vec<CertificateDer<'static>>, TransportError> {
        let server_name = ServerName::try_from(host_part(addr).to_string()).map_err(config_error)?;
        let connector = TlsConnector::from(self.config.clone());

        let handshake = async {
            let tcp = TcpStream::connect(addr)
                .await
                .map_err(|e| TransportError::from_io(&e))?;
            let stream = connector
                .connect(server_name, tcp)
                .await
                .map_err(|e| TransportError::from_io(&e))?;
            let (_, session) = stream.get_ref();
            let chain: Vec<CertificateDer<'static>> = session
                .peer_certificates()
                .map(|certs| certs.iter().map(|c| c.clone().into_owned()).collect())
                .unwrap_or_default();
            Ok::<_, TransportError>(chain)
        };

        tokio::time::timeout(timeout, handshake)
            .await
            .map_err(|_| TransportError::Timeout(format!("TLS handshake with {addr}")))?
    }
}

// =============================================================================
// PINNED
// =============================================================================

/// Accepts a leaf byte-identical to one in the pinned chain, otherwise
/// defers to WebPKI over platform roots plus the pinned chain.
#[derive(Debug)]
pub struct PinnedCertVerifier {
    pinned: Vec<CertificateDer<'static>>,
    fallback: Option<Arc<WebPkiServerVerifier>>,
    provider: Arc<CryptoProvider>,
}

impl PinnedCertVerifier {
    pub fn new(pinned: Vec<CertificateDer<'static>>) -> Result<Self, TransportError> {
        let provider = provider();
        let roots = root_store(&pinned);
        let fallback = if roots.is_empty() {
            None
        } else {
            Some(
                WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider.clone())
                    .build()
                    .map_err(config_error)?,
            )
        };
        Ok(Self {
            pinned,
            fallback,
            provider,
        })
    }

    fn is_pinned(&self, end_entity: &CertificateDer<'_>) -> bool {
        self.pinned.iter().any(|pin| {
            pin.len() == end_entity.len() && bool::from(pin.as_ref().ct_eq(end_entity.as_ref()))
        })
    }
}

impl ServerCertVerifier for PinnedCertVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        if self.is_pinned(end_entity) {
            return Ok(ServerCertVerified::assertion());
        }
        match &self.fallback {
            Some(inner) => {
                inner.verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
            }
            None => Err(rustls::Error::InvalidCertificate(
                CertificateError::UnknownIssuer,
            )),
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// TLS that trusts a previously pinned chain.
#[derive(Debug, Clone)]
pub struct PinnedTls {
    config: Arc<rustls::ClientConfig>,
}

impl PinnedTls {
    pub fn new(pinned: Vec<CertificateDer<'static>>) -> Result<Self, TransportError> {
        if pinned.is_empty() {
            return Err(TransportError::Config("pinned chain is empty".into()));
        }
        let verifier = PinnedCertVerifier::new(pinned)?;
        let config = rustls::ClientConfig::builder_with_provider(provider())
            .with_safe_default_protocol_versions()
            .map_err(config_error)?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(verifier))
            .with_no_client_auth();
        Ok(Self {
            config: Arc::new(config),
        })
    }
}

impl TrustedTransport for PinnedTls {
    fn rustls_config(&self) -> &rustls::ClientConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf() -> CertificateDer<'static> {
        rcgen::generate_simple_self_signed(vec!["clipshare".to_string()])
            .unwrap()
            .cert
            .der()
            .clone()
    }

    fn name() -> ServerName<'static> {
        ServerName::try_from("clipshare").unwrap()
    }

    #[test]
    fn test_pinned_leaf_accepted() {
        let cert = leaf();
        let verifier = PinnedCertVerifier::new(vec![cert.clone()]).unwrap();

        let result = verifier.verify_server_cert(&cert, &[], &name(), &[], UnixTime::now());
        assert!(result.is_ok());
    }

    #[test]
    fn test_unpinned_leaf_rejected_as_certificate_error() {
        let verifier = PinnedCertVerifier::new(vec![leaf()]).unwrap();

        let err = verifier
            .verify_server_cert(&leaf(), &[], &name(), &[], UnixTime::now())
            .unwrap_err();
        assert!(matches!(err, rustls::Error::InvalidCertificate(_)));
    }

    #[test]
    fn test_empty_pin_refused() {
        assert!(matches!(
            PinnedTls::new(Vec::new()),
            Err(TransportError::Config(_))
        ));
    }

    #[test]
    fn test_capability_objects_build_clients() {
        let timeouts = Timeouts::default();
        assert!(VerifyingTls::new(&[]).unwrap().http_client(&timeouts).is_ok());
        assert!(InsecureTls::new().unwrap().probe_client(&timeouts).is_ok());
        assert!(PinnedTls::new(vec![leaf()]).unwrap().http_client(&timeouts).is_ok());
    }

    #[tokio::test]
    async fn test_capture_chain_unreachable() {
        // Bind then drop to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = InsecureTls::new()
            .unwrap()
            .capture_chain(&addr, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Unreachable(_)));
    }
}
