//! Server error types.
//!
//! [`StoreError`] is the only error a route handler returns; its
//! `IntoResponse` impl is the single place handler failures become HTTP
//! statuses. Authentication failures never reach a handler.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared_auth::FileIdError;
use thiserror::Error;
use tracing::{debug, error};

use super::config::ConfigError;

/// Errors starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rustls::Error> for ServerError {
    fn from(err: rustls::Error) -> Self {
        ServerError::Tls(err.to_string())
    }
}

/// Errors from clip storage and the handlers in front of it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    InvalidId(#[from] FileIdError),

    #[error("clip {0:?} not found")]
    NotFound(String),

    #[error("clip exceeds limit of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("request body error: {0}")]
    Body(String),

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn status(&self) -> StatusCode {
        match self {
            StoreError::InvalidId(_) => StatusCode::BAD_REQUEST,
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            StoreError::Body(_) => StatusCode::BAD_REQUEST,
            StoreError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            debug!(error = %self, status = status.as_u16(), "Request rejected");
        }
        // Body stays empty; details are for the local log.
        status.into_response()
    }
}
