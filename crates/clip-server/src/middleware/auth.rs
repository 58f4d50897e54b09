//! HMAC request authentication.
//!
//! Runs as a route layer in front of every protected handler. The precise
//! [`AuthError`](shared_auth::AuthError) is logged here; the client only
//! ever sees [`unauthorized_response`].

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
};
use shared_auth::{AuthOutcome, Authenticator, TimeSource, SCHEME};
use std::net::SocketAddr;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{debug, warn};

/// Authentication layer
#[derive(Clone)]
pub struct HmacAuthLayer {
    authenticator: Arc<Authenticator>,
    clock: Arc<dyn TimeSource>,
}

impl HmacAuthLayer {
    pub fn new(authenticator: Arc<Authenticator>, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            authenticator,
            clock,
        }
    }
}

impl<S> Layer<S> for HmacAuthLayer {
    type Service = HmacAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HmacAuthService {
            inner,
            authenticator: Arc::clone(&self.authenticator),
            clock: Arc::clone(&self.clock),
        }
    }
}

/// Authentication service
#[derive(Clone)]
pub struct HmacAuthService<S> {
    inner: S,
    authenticator: Arc<Authenticator>,
    clock: Arc<dyn TimeSource>,
}

impl<S> Service<Request<Body>> for HmacAuthService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        // Path only: the query string is not covered by the signature.
        let result = self.authenticator.authorize(
            req.headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok()),
            req.method().as_str(),
            req.uri().path(),
            self.clock.now_unix(),
        );

        match result {
            Ok(()) => {
                debug!(method = %req.method(), path = req.uri().path(), "Request authorized");
                // Swap in the clone so the readied service handles this call.
                let clone = self.inner.clone();
                let mut inner = std::mem::replace(&mut self.inner, clone);
                Box::pin(async move { inner.call(req).await })
            }
            Err(err) => {
                warn!(
                    remote = %remote_addr(&req),
                    method = %req.method(),
                    path = req.uri().path(),
                    reason = err.kind(),
                    error = %err,
                    "Authentication failed"
                );
                let response = unauthorized_response(err.outcome());
                Box::pin(async move { Ok(response) })
            }
        }
    }
}

fn remote_addr<B>(req: &Request<B>) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// The single HTTP rendering of an authentication outcome. Identical for
/// every failure reason.
pub fn unauthorized_response(outcome: AuthOutcome) -> Response {
    debug_assert_eq!(outcome, AuthOutcome::Unauthorized);
    let mut response = StatusCode::UNAUTHORIZED.into_response();
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(SCHEME));
    response
}
