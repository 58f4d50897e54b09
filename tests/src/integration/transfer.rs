//! # Signed Transfer
//!
//! Copy and paste through [`ClipClient`] after discovery, over the pinned
//! or verified transport.

#[cfg(test)]
mod tests {
    use clip_client::pem::parse_certificates;
    use clip_client::{ClientError, ClipClient, Discoverer, PinnedTls, Timeouts, VerifyingTls};
    use shared_auth::{derive_secret, FixedTimeSource, Signer, SystemTimeSource, TrustStore};

    use crate::fixtures::{ca_signed, self_signed, TestServer, PASSPHRASE};

    async fn joined(server: &TestServer, passphrase: &str) -> TrustStore {
        let result = Discoverer::new(
            &server.addr(),
            VerifyingTls::new(&[]).unwrap(),
            Timeouts::default(),
        )
        .discover()
        .await
        .unwrap();
        let secret = derive_secret(passphrase, &result.salt).unwrap();
        TrustStore::new(server.addr(), secret, result.salt, result.pinned)
    }

    #[tokio::test]
    async fn test_copy_then_paste_over_pinned_tls() {
        let server = TestServer::start(&self_signed()).await;
        let store = joined(&server, PASSPHRASE).await;
        let client = ClipClient::from_trust_store(&store, &[], Timeouts::default()).unwrap();

        client.verify().await.unwrap();
        client.copy("notes", b"hello from the other laptop".to_vec()).await.unwrap();
        let pasted = client.paste("notes").await.unwrap();

        assert_eq!(&pasted[..], b"hello from the other laptop");
        server.stop().await;
    }

    #[tokio::test]
    async fn test_copy_replaces_previous_clip() {
        let server = TestServer::start(&self_signed()).await;
        let store = joined(&server, PASSPHRASE).await;
        let client = ClipClient::from_trust_store(&store, &[], Timeouts::default()).unwrap();

        client.copy("default", b"first".to_vec()).await.unwrap();
        client.copy("default", b"second".to_vec()).await.unwrap();

        assert_eq!(&client.paste("default").await.unwrap()[..], b"second");
        server.stop().await;
    }

    #[tokio::test]
    async fn test_verified_server_uses_extra_root() {
        let pki = ca_signed();
        let server = TestServer::start(&pki.leaf).await;
        let roots = vec![pki.ca_der.clone()];

        let result = Discoverer::new(&server.addr(), VerifyingTls::new(&roots).unwrap(), Timeouts::default())
            .discover()
            .await
            .unwrap();
        let secret = derive_secret(PASSPHRASE, &result.salt).unwrap();
        let store = TrustStore::new(server.addr(), secret, result.salt, result.pinned);

        let client = ClipClient::from_trust_store(&store, &roots, Timeouts::default()).unwrap();
        client.copy("ca", b"verified".to_vec()).await.unwrap();
        assert_eq!(&client.paste("ca").await.unwrap()[..], b"verified");
        server.stop().await;
    }

    #[tokio::test]
    async fn test_wrong_passphrase_is_unauthorized() {
        let server = TestServer::start(&self_signed()).await;
        let store = joined(&server, "not the passphrase").await;
        let client = ClipClient::from_trust_store(&store, &[], Timeouts::default()).unwrap();

        assert!(matches!(client.verify().await, Err(ClientError::Unauthorized)));
        assert!(matches!(
            client.copy("x", b"data".to_vec()).await,
            Err(ClientError::Unauthorized)
        ));
        server.stop().await;
    }

    #[tokio::test]
    async fn test_stale_signature_is_unauthorized() {
        let server = TestServer::start(&self_signed()).await;
        let store = joined(&server, PASSPHRASE).await;

        let chain = parse_certificates(store.pinned_certificate().unwrap().as_pem()).unwrap();
        let now = shared_auth::TimeSource::now_unix(&SystemTimeSource);
        let signer = Signer::new(store.secret().clone(), FixedTimeSource::new(now - 3600));
        let client = ClipClient::new(
            store.server_addr(),
            &PinnedTls::new(chain).unwrap(),
            signer,
            Timeouts::default(),
        )
        .unwrap();

        assert!(matches!(client.verify().await, Err(ClientError::Unauthorized)));
        server.stop().await;
    }

    #[tokio::test]
    async fn test_pin_rejects_a_different_server() {
        let first = TestServer::start(&self_signed()).await;
        let store = joined(&first, PASSPHRASE).await;

        // Same address book entry, different certificate.
        let impostor = TestServer::start(&self_signed()).await;
        let redirected = TrustStore::new(
            impostor.addr(),
            store.secret().clone(),
            store.salt().clone(),
            store.pinned_certificate().cloned(),
        );
        let client = ClipClient::from_trust_store(&redirected, &[], Timeouts::default()).unwrap();

        match client.verify().await {
            Err(ClientError::Transport(_)) => {}
            other => panic!("expected a TLS failure, got {other:?}"),
        }

        first.stop().await;
        impostor.stop().await;
    }

    #[tokio::test]
    async fn test_missing_clip_is_not_found() {
        let server = TestServer::start(&self_signed()).await;
        let store = joined(&server, PASSPHRASE).await;
        let client = ClipClient::from_trust_store(&store, &[], Timeouts::default()).unwrap();

        assert!(matches!(
            client.paste("nothing-here").await,
            Err(ClientError::Status { status: 404 })
        ));
        server.stop().await;
    }
}
