//! # Discovery Flows
//!
//! Secure probe first; the insecure probe and pinning only when the
//! certificate is not trusted.

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use clip_client::pem::parse_certificates;
    use clip_client::{
        Discoverer, DiscoveryError, DiscoveryPhase, Timeouts, TransportError, VerifyingTls,
    };

    use crate::fixtures::{ca_signed, closed_port, self_signed, serve_router, TestServer};

    fn discoverer(addr: &str, extra_roots: &[rustls::pki_types::CertificateDer<'static>]) -> Discoverer {
        let timeouts = Timeouts {
            connect: std::time::Duration::from_secs(2),
            request: std::time::Duration::from_secs(5),
        };
        Discoverer::new(addr, VerifyingTls::new(extra_roots).unwrap(), timeouts)
    }

    // =========================================================================
    // TRUST ON FIRST USE
    // =========================================================================

    #[tokio::test]
    async fn test_self_signed_server_is_pinned() {
        let identity = self_signed();
        let server = TestServer::start(&identity).await;

        let result = discoverer(&server.addr(), &[]).discover().await.unwrap();

        assert_eq!(result.phase, DiscoveryPhase::Pinned);
        assert_eq!(result.salt, server.salt);

        let pinned = result.pinned.expect("pinned chain");
        let captured = parse_certificates(pinned.as_pem()).unwrap();
        let served = parse_certificates(&identity.cert_pem).unwrap();
        assert_eq!(captured, served);

        server.stop().await;
    }

    #[tokio::test]
    async fn test_unknown_ca_is_pinned_too() {
        let pki = ca_signed();
        let server = TestServer::start(&pki.leaf).await;

        let result = discoverer(&server.addr(), &[]).discover().await.unwrap();

        assert_eq!(result.phase, DiscoveryPhase::Pinned);
        assert!(result.pinned.is_some());
        server.stop().await;
    }

    // =========================================================================
    // VERIFIED
    // =========================================================================

    #[tokio::test]
    async fn test_trusted_server_needs_no_pin() {
        let pki = ca_signed();
        let server = TestServer::start(&pki.leaf).await;

        let result = discoverer(&server.addr(), &[pki.ca_der.clone()])
            .discover()
            .await
            .unwrap();

        assert_eq!(result.phase, DiscoveryPhase::Verified);
        assert!(result.pinned.is_none());
        assert_eq!(result.salt, server.salt);
        server.stop().await;
    }

    // =========================================================================
    // FAILURES
    // =========================================================================

    #[tokio::test]
    async fn test_unreachable_server() {
        let err = discoverer(&closed_port(), &[]).discover().await.unwrap_err();

        assert!(matches!(
            err,
            DiscoveryError::Transport(TransportError::Unreachable(_))
        ));
        assert!(err.to_string().starts_with("server unreachable"));
    }

    #[tokio::test]
    async fn test_missing_salt_is_invalid_response() {
        let identity = self_signed();
        let router = Router::new().route("/", get(|| async { r#"{"version":1}"# }));
        let (addr, handle) = serve_router(&identity, router).await;

        let err = discoverer(&addr.to_string(), &[]).discover().await.unwrap_err();

        assert!(matches!(err, DiscoveryError::Format(_)));
        assert!(err.to_string().starts_with("invalid discovery response"));
        handle.abort();
    }

    #[tokio::test]
    async fn test_unsupported_version_is_invalid_response() {
        let identity = self_signed();
        let router = Router::new().route(
            "/",
            get(|| async { r#"{"version":2,"salt":"c2FsdA=="}"# }),
        );
        let (addr, handle) = serve_router(&identity, router).await;

        let err = discoverer(&addr.to_string(), &[]).discover().await.unwrap_err();

        assert!(matches!(err, DiscoveryError::Format(_)));
        handle.abort();
    }

    #[tokio::test]
    async fn test_failed_fallback_reports_original_error() {
        let identity = self_signed();
        let router = Router::new().route("/", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
        let (addr, handle) = serve_router(&identity, router).await;

        let err = discoverer(&addr.to_string(), &[]).discover().await.unwrap_err();

        assert!(
            matches!(
                err,
                DiscoveryError::Transport(TransportError::UntrustedCertificate(_))
            ),
            "got {err:?}"
        );
        handle.abort();
    }
}
