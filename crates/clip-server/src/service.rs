//! Clip server - TLS accept loop and connection serving.

use axum::extract::ConnectInfo;
use axum::Router;
use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use shared_auth::{Authenticator, SystemTimeSource, TimeSource};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;
use tower::ServiceExt;
use tracing::{debug, error, info, warn};

use crate::adapters::FsClipStore;
use crate::domain::{ServerConfig, ServerError};
use crate::ports::ClipStore;
use crate::routes::{build_router, AppState};
use crate::tls::load_acceptor;

/// Back-off after a failed `accept`, e.g. when out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Clip server state
pub struct ClipServer {
    config: ServerConfig,
    router: Router,
    acceptor: TlsAcceptor,
}

impl ClipServer {
    /// Server backed by the configured certificate files, a filesystem
    /// store and the system clock.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;
        let acceptor = load_acceptor(&config.cert_file, &config.key_file)?;
        let store = Arc::new(FsClipStore::new(&config.cache_dir, config.max_clip_size));
        Self::with_parts(config, acceptor, store, Arc::new(SystemTimeSource))
    }

    /// Server with explicitly supplied collaborators.
    pub fn with_parts(
        config: ServerConfig,
        acceptor: TlsAcceptor,
        store: Arc<dyn ClipStore>,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, ServerError> {
        config.validate()?;

        let authenticator = Arc::new(Authenticator::new(config.secret()?, config.max_request_age));
        let state = AppState {
            salt_b64: config.salt()?.to_base64().into(),
            server_addr: config.server_addr.as_deref().map(Arc::from),
            store,
        };
        let router = build_router(state, authenticator, clock);

        Ok(Self {
            config,
            router,
            acceptor,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind `listen_addr` and serve until `shutdown` fires.
    pub async fn run(self, shutdown: oneshot::Receiver<()>) -> Result<(), ServerError> {
        let addr = self.config.listen_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener in a background task.
    pub fn spawn(self, listener: TcpListener) -> Result<RunningServer, ServerError> {
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(self.serve(listener, shutdown_rx));
        Ok(RunningServer {
            addr,
            shutdown_tx: Some(shutdown_tx),
            handle,
        })
    }

    /// Accept loop. Connections already accepted keep running after
    /// shutdown until their client closes them.
    pub async fn serve(
        self,
        listener: TcpListener,
        mut shutdown: oneshot::Receiver<()>,
    ) -> Result<(), ServerError> {
        info!(addr = %listener.local_addr()?, "Clip server listening");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Received shutdown signal");
                    break;
                }
                accepted = listener.accept() => {
                    let (tcp, remote) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!(error = %e, "Accept failed");
                            tokio::time::sleep(ACCEPT_BACKOFF).await;
                            continue;
                        }
                    };
                    tokio::spawn(serve_connection(
                        self.acceptor.clone(),
                        self.router.clone(),
                        tcp,
                        remote,
                        self.config.handshake_timeout,
                    ));
                }
            }
        }

        info!("Clip server stopped");
        Ok(())
    }
}

async fn serve_connection(
    acceptor: TlsAcceptor,
    router: Router,
    tcp: TcpStream,
    remote: SocketAddr,
    handshake_timeout: Duration,
) {
    let tls = match tokio::time::timeout(handshake_timeout, acceptor.accept(tcp)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            debug!(%remote, error = %e, "TLS handshake failed");
            return;
        }
        Err(_) => {
            debug!(%remote, "TLS handshake timed out");
            return;
        }
    };

    let service = router.map_request(move |mut req: Request<Incoming>| {
        req.extensions_mut().insert(ConnectInfo(remote));
        req
    });

    if let Err(e) = auto::Builder::new(TokioExecutor::new())
        .serve_connection(TokioIo::new(tls), TowerToHyperService::new(service))
        .await
    {
        debug!(%remote, error = %e, "Connection closed with error");
    }
}

/// Handle to a server started with [`ClipServer::spawn`].
pub struct RunningServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), ServerError>>,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Trigger graceful shutdown and wait for the accept loop to exit.
    pub async fn shutdown(mut self) -> Result<(), ServerError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        match self.handle.await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "Server task failed");
                Err(ServerError::Io(std::io::Error::other(e)))
            }
        }
    }
}
