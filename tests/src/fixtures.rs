//! Shared test fixtures.
//!
//! Everything here panics on failure; it only ever runs under test.

use axum::Router;
use clip_server::{
    acceptor_from_pem, generate_self_signed, CertifiedPem, ClipServer, FsClipStore,
    RunningServer, ServerConfig,
};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use rcgen::{
    BasicConstraints, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa, KeyPair,
};
use rustls::pki_types::CertificateDer;
use shared_auth::{derive_secret, Salt, SystemTimeSource};
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;

pub const PASSPHRASE: &str = "correct horse battery staple";

/// Names every test certificate is valid for.
pub fn loopback_hosts() -> Vec<String> {
    vec!["localhost".to_string(), "127.0.0.1".to_string()]
}

/// Self-signed loopback certificate, as `clipshare setup` would create.
pub fn self_signed() -> CertifiedPem {
    generate_self_signed(&loopback_hosts()).expect("self-signed certificate")
}

/// A private CA and a loopback leaf it signed.
pub struct CaSigned {
    pub ca_der: CertificateDer<'static>,
    pub ca_pem: String,
    pub leaf: CertifiedPem,
}

pub fn ca_signed() -> CaSigned {
    let ca_key = KeyPair::generate().expect("ca key");
    let mut ca_params = CertificateParams::new(Vec::<String>::new()).expect("ca params");
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    ca_params
        .distinguished_name
        .push(DnType::CommonName, "clipshare test ca");
    let ca = ca_params.self_signed(&ca_key).expect("ca certificate");

    let leaf_key = KeyPair::generate().expect("leaf key");
    let mut leaf_params = CertificateParams::new(loopback_hosts()).expect("leaf params");
    leaf_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
    let leaf = leaf_params
        .signed_by(&leaf_key, &ca, &ca_key)
        .expect("leaf certificate");

    CaSigned {
        ca_der: ca.der().clone(),
        ca_pem: ca.pem(),
        leaf: CertifiedPem {
            cert_pem: leaf.pem(),
            key_pem: leaf_key.serialize_pem(),
        },
    }
}

/// A clip server on an ephemeral loopback port.
pub struct TestServer {
    pub server: Option<RunningServer>,
    pub config: ServerConfig,
    pub salt: Salt,
    _cache: TempDir,
}

impl TestServer {
    pub async fn start(identity: &CertifiedPem) -> Self {
        Self::start_with_passphrase(identity, PASSPHRASE).await
    }

    pub async fn start_with_passphrase(identity: &CertifiedPem, passphrase: &str) -> Self {
        let cache = tempfile::tempdir().expect("cache dir");
        let salt = Salt::generate();
        let secret = derive_secret(passphrase, &salt).expect("derive secret");

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let config = ServerConfig {
            listen_addr: listener.local_addr().expect("local addr"),
            cache_dir: cache.path().to_path_buf(),
            key: Some(secret.to_base64()),
            salt: Some(salt.to_base64()),
            max_clip_size: 4 * 1024 * 1024,
            ..ServerConfig::default()
        };

        let acceptor =
            acceptor_from_pem(&identity.cert_pem, &identity.key_pem).expect("acceptor");
        let store = Arc::new(FsClipStore::new(&config.cache_dir, config.max_clip_size));
        let server = ClipServer::with_parts(
            config.clone(),
            acceptor,
            store,
            Arc::new(SystemTimeSource),
        )
        .expect("server")
        .spawn(listener)
        .expect("spawn");

        Self {
            server: Some(server),
            config,
            salt,
            _cache: cache,
        }
    }

    /// `127.0.0.1:<port>`
    pub fn addr(&self) -> String {
        self.config.listen_addr.to_string()
    }

    pub async fn stop(mut self) {
        if let Some(server) = self.server.take() {
            server.shutdown().await.expect("clean shutdown");
        }
    }
}

/// Serve an arbitrary router over TLS, for endpoints that misbehave in
/// ways the real server never does.
pub async fn serve_router(identity: &CertifiedPem, router: Router) -> (SocketAddr, JoinHandle<()>) {
    let acceptor: TlsAcceptor =
        acceptor_from_pem(&identity.cert_pem, &identity.key_pem).expect("acceptor");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    let handle = tokio::spawn(async move {
        loop {
            let Ok((tcp, _)) = listener.accept().await else {
                continue;
            };
            let acceptor = acceptor.clone();
            let router = router.clone();
            tokio::spawn(async move {
                let Ok(tls) = acceptor.accept(tcp).await else {
                    return;
                };
                let _ = auto::Builder::new(TokioExecutor::new())
                    .serve_connection(TokioIo::new(tls), TowerToHyperService::new(router))
                    .await;
            });
        }
    });

    (addr, handle)
}

/// A loopback port with nothing listening on it.
pub fn closed_port() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr").to_string();
    drop(listener);
    addr
}
