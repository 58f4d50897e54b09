//! Server certificates: loading PEM files and generating self-signed ones.

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use std::path::Path;
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;

use crate::domain::ServerError;

/// Certificate and private key, both PEM.
#[derive(Clone)]
pub struct CertifiedPem {
    pub cert_pem: String,
    pub key_pem: String,
}

impl std::fmt::Debug for CertifiedPem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertifiedPem")
            .field("cert_pem", &self.cert_pem)
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

/// Self-signed certificate valid for `hosts` (DNS names or IP literals).
pub fn generate_self_signed(hosts: &[String]) -> Result<CertifiedPem, ServerError> {
    let certified = rcgen::generate_simple_self_signed(hosts.to_vec())
        .map_err(|e| ServerError::Tls(format!("certificate generation: {e}")))?;
    Ok(CertifiedPem {
        cert_pem: certified.cert.pem(),
        key_pem: certified.key_pair.serialize_pem(),
    })
}

/// Acceptor from PEM files on disk.
pub fn load_acceptor(cert_file: &Path, key_file: &Path) -> Result<TlsAcceptor, ServerError> {
    let cert_pem = std::fs::read_to_string(cert_file)?;
    let key_pem = std::fs::read_to_string(key_file)?;
    acceptor_from_pem(&cert_pem, &key_pem)
}

/// Acceptor from in-memory PEM. Offers h2 and http/1.1.
pub fn acceptor_from_pem(cert_pem: &str, key_pem: &str) -> Result<TlsAcceptor, ServerError> {
    let certs: Vec<CertificateDer<'static>> =
        rustls_pemfile::certs(&mut cert_pem.as_bytes()).collect::<Result<_, _>>()?;
    if certs.is_empty() {
        return Err(ServerError::Tls("no certificates in PEM".into()));
    }
    let key: PrivateKeyDer<'static> = rustls_pemfile::private_key(&mut key_pem.as_bytes())?
        .ok_or_else(|| ServerError::Tls("no private key in PEM".into()))?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(TlsAcceptor::from(Arc::new(config)))
}
