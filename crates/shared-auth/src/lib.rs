//! # Shared Auth
//!
//! The trust core of ClipShare: everything a client needs to sign a request
//! and everything a server needs to authenticate it. The only I/O is
//! [`private_file::write_private`], used by both sides for key material.
//!
//! ## Protocol
//!
//! ```text
//! Authorization: HMAC v1 <unix-timestamp> <base64(HMAC-SHA256(secret, descriptor))>
//!
//! descriptor = "<timestamp>:<METHOD>:<raw request path>"
//! ```
//!
//! A token is valid iff the MAC matches and `|now - timestamp| <= max_request_age`.
//! There is no nonce cache: a captured request stays replayable until the
//! freshness window elapses. That is the price of statelessness.
//!
//! ## Components
//!
//! - [`Signer`]: builds [`AuthorizationToken`]s from an injected clock
//! - [`Authenticator`]: parses the header, recomputes the MAC, checks freshness
//! - [`TrustStore`]: the read-only bundle of secret, salt and pinned certificate
//!
//! [`SharedSecret`] and [`Salt`] are immutable once constructed; both sides
//! share them across concurrent requests without locking.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod authenticator;
pub mod clock;
pub mod errors;
pub mod file_id;
pub mod private_file;
pub mod secret;
pub mod serde_helpers;
pub mod signer;
pub mod token;
pub mod trust_store;

pub use authenticator::{Authenticator, DEFAULT_MAX_REQUEST_AGE};
pub use clock::{FixedTimeSource, SystemTimeSource, TimeSource};
pub use errors::{AuthError, AuthOutcome, FileIdError, SecretError};
pub use file_id::FileId;
pub use private_file::write_private;
pub use secret::{derive_secret, Salt, SharedSecret};
pub use signer::{compute_mac, Signer};
pub use token::{AuthorizationToken, HeaderParser, ParsedHeader, RequestDescriptor, SCHEME};
pub use trust_store::{PinnedCertificate, TrustStore};

/// Version advertised by the discovery endpoint.
pub const PROTOCOL_VERSION: u32 = 1;
