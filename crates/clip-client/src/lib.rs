//! # Clip Client
//!
//! Client side of the ClipShare trust protocol.
//!
//! - [`Discoverer`]: one-shot first contact, returning the server salt and,
//!   only after an explicit insecure fallback, a pinned certificate chain
//! - [`VerifyingTls`], [`InsecureTls`], [`PinnedTls`]: separately constructed
//!   TLS capabilities; only the first and last can carry signed traffic
//! - [`ClipClient`]: signed `copy`/`paste`/`verify` requests
//! - [`ClientConfig`] and [`PinFile`]: what `join` persists

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod pem;
pub mod pin_file;
pub mod tls;

pub use client::ClipClient;
pub use config::{ClientConfig, ConfigError, Timeouts, DEFAULT_PORT};
pub use discovery::{Discoverer, DiscoveryPhase, DiscoveryResult};
pub use errors::{ClientError, DiscoveryError, PinError, TransportError};
pub use pin_file::PinFile;
pub use tls::{InsecureTls, PinnedTls, TrustedTransport, VerifyingTls};
