//! # Clip Server
//!
//! HTTPS server for ClipShare.
//!
//! ## Request path
//!
//! ```text
//! TCP accept → TLS handshake (bounded) → hyper → TracingLayer
//!     → public routes (/, /install, /get)
//!     → HmacAuthLayer → protected routes (/verify, /clip/:id)
//! ```
//!
//! Clip identifiers are validated before storage is touched, and the
//! content-sniffing writer only ever runs behind authentication.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod content_type;
pub mod domain;
pub mod install;
pub mod middleware;
pub mod ports;
pub mod routes;
pub mod service;
pub mod sniff;
pub mod tls;

pub use adapters::FsClipStore;
pub use content_type::ContentTypeWriter;
pub use domain::{ConfigError, ServerConfig, ServerError, StoreError};
pub use ports::ClipStore;
pub use routes::{build_router, AppState, InfoResponse};
pub use service::{ClipServer, RunningServer};
pub use sniff::detect_content_type;
pub use tls::{acceptor_from_pem, generate_self_signed, load_acceptor, CertifiedPem};
