//! Signed requests after discovery.

use bytes::Bytes;
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, StatusCode};
use rustls::pki_types::CertificateDer;
use shared_auth::{FileId, SystemTimeSource, Signer, TimeSource, TrustStore};
use tracing::{debug, instrument};

use crate::config::{with_default_port, Timeouts};
use crate::errors::{ClientError, PinError, TransportError};
use crate::pem::parse_certificates;
use crate::tls::{PinnedTls, TrustedTransport, VerifyingTls};

/// Client for one server. Every request carries a fresh `HMAC v1` header.
///
/// Built only from a [`TrustedTransport`], so the insecure discovery
/// configuration can never reach it.
#[derive(Debug)]
pub struct ClipClient<T: TimeSource = SystemTimeSource> {
    base_url: String,
    http: reqwest::Client,
    signer: Signer<T>,
}

impl ClipClient<SystemTimeSource> {
    /// Pinned TLS if the store has a pin, verifying TLS otherwise.
    pub fn from_trust_store(
        store: &TrustStore,
        extra_roots: &[CertificateDer<'static>],
        timeouts: Timeouts,
    ) -> Result<Self, ClientError> {
        let signer = store.signer(SystemTimeSource);
        match store.pinned_certificate() {
            Some(pin) => {
                let chain = parse_certificates(pin.as_pem())?;
                if chain.is_empty() {
                    return Err(PinError::NoCertificates(store.server_addr().to_string()).into());
                }
                Self::new(store.server_addr(), &PinnedTls::new(chain)?, signer, timeouts)
            }
            None => Self::new(
                store.server_addr(),
                &VerifyingTls::new(extra_roots)?,
                signer,
                timeouts,
            ),
        }
    }
}

impl<T: TimeSource> ClipClient<T> {
    pub fn new(
        server_addr: &str,
        transport: &impl TrustedTransport,
        signer: Signer<T>,
        timeouts: Timeouts,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            base_url: format!("https://{}", with_default_port(server_addr)),
            http: transport.http_client(&timeouts)?,
            signer,
        })
    }

    /// Check that the secret is accepted.
    pub async fn verify(&self) -> Result<(), ClientError> {
        self.send(Method::GET, "/verify", None).await.map(|_| ())
    }

    /// Store `body` under `id`.
    #[instrument(skip(self, body), fields(bytes = body.len()))]
    pub async fn copy(&self, id: &str, body: Vec<u8>) -> Result<(), ClientError> {
        let id = FileId::parse(id)?;
        self.send(Method::PUT, &id.clip_path(), Some(body)).await.map(|_| ())
    }

    /// Fetch the clip stored under `id`.
    #[instrument(skip(self))]
    pub async fn paste(&self, id: &str) -> Result<Bytes, ClientError> {
        let id = FileId::parse(id)?;
        let response = self.send(Method::GET, &id.clip_path(), None).await?;
        response
            .bytes()
            .await
            .map_err(|e| TransportError::from_reqwest(&e).into())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<reqwest::Response, ClientError> {
        let token = self.signer.sign(method.as_str(), path);
        let mut request = self
            .http
            .request(method.clone(), format!("{}{}", self.base_url, path))
            .header(AUTHORIZATION, token.header_value());
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;
        debug!(%method, path, status = response.status().as_u16(), "Request complete");
        check_status(response.status())?;
        Ok(response)
    }
}

fn check_status(status: StatusCode) -> Result<(), ClientError> {
    if status.is_success() {
        Ok(())
    } else if status == StatusCode::UNAUTHORIZED {
        Err(ClientError::Unauthorized)
    } else {
        Err(ClientError::Status {
            status: status.as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_auth::{PinnedCertificate, Salt, SharedSecret};

    fn store(pin: Option<PinnedCertificate>) -> TrustStore {
        TrustStore::new(
            "clip.lan",
            SharedSecret::from_bytes(vec![1u8; 32]).unwrap(),
            Salt::from_bytes(vec![2u8; 32]).unwrap(),
            pin,
        )
    }

    #[test]
    fn test_status_mapping() {
        assert!(check_status(StatusCode::OK).is_ok());
        assert!(check_status(StatusCode::NO_CONTENT).is_ok());
        assert!(matches!(
            check_status(StatusCode::UNAUTHORIZED),
            Err(ClientError::Unauthorized)
        ));
        assert!(matches!(
            check_status(StatusCode::NOT_FOUND),
            Err(ClientError::Status { status: 404 })
        ));
    }

    #[test]
    fn test_from_store_uses_default_port() {
        let client = ClipClient::from_trust_store(&store(None), &[], Timeouts::default()).unwrap();
        assert_eq!(client.base_url, "https://clip.lan:2586");
    }

    #[test]
    fn test_from_store_rejects_pin_without_certificates() {
        let pin = PinnedCertificate::from_pem("not pem at all").unwrap();
        let err = ClipClient::from_trust_store(&store(Some(pin)), &[], Timeouts::default())
            .unwrap_err();
        assert!(matches!(err, ClientError::Pin(PinError::NoCertificates(_))));
    }

    #[tokio::test]
    async fn test_invalid_id_rejected_before_network() {
        let client = ClipClient::from_trust_store(&store(None), &[], Timeouts::default()).unwrap();
        let err = client.paste("../etc/passwd").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidFileId(_)));
    }
}
