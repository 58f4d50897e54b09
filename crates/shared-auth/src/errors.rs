//! Error types for signing, authentication and secret handling.

use thiserror::Error;

/// Why a request failed authentication.
///
/// Each variant is a distinct rejection point of [`crate::Authenticator`].
/// The detail is for the local audit log only; callers must collapse every
/// variant into [`AuthOutcome::Unauthorized`] via [`AuthError::outcome`]
/// before anything reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Header absent or not of the form `HMAC v1 <digits> <token>`.
    #[error("authorization header missing or malformed")]
    MissingHeader,

    /// Timestamp digits do not fit a signed 64-bit integer.
    #[error("invalid timestamp {0:?}")]
    BadTimestamp(String),

    /// MAC token is not valid base64.
    #[error("invalid mac encoding: {0}")]
    BadEncoding(String),

    /// Recomputed MAC differs from the presented one.
    #[error("mac mismatch")]
    BadMac,

    /// Timestamp outside the freshness window, in either direction.
    #[error("request age {age}s exceeds window of {max_age}s")]
    Expired {
        /// Absolute distance between the signed timestamp and now.
        age: u64,
        /// Configured window.
        max_age: u64,
    },
}

/// The only authentication result that may cross a trust boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Request carries a valid, fresh signature.
    Authorized,
    /// Request rejected; the reason is deliberately withheld.
    Unauthorized,
}

impl AuthError {
    /// Maps any internal failure to the uniform external outcome.
    pub fn outcome(&self) -> AuthOutcome {
        AuthOutcome::Unauthorized
    }

    /// Short stable label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingHeader => "missing_header",
            Self::BadTimestamp(_) => "bad_timestamp",
            Self::BadEncoding(_) => "bad_encoding",
            Self::BadMac => "bad_mac",
            Self::Expired { .. } => "expired",
        }
    }
}

impl From<Result<(), AuthError>> for AuthOutcome {
    fn from(result: Result<(), AuthError>) -> Self {
        match result {
            Ok(()) => AuthOutcome::Authorized,
            Err(e) => e.outcome(),
        }
    }
}

/// Errors decoding or deriving secret material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretError {
    /// Not valid base64.
    #[error("invalid base64: {0}")]
    InvalidEncoding(String),

    /// Zero-length secret or salt.
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// Key derivation failed.
    #[error("key derivation failed: {0}")]
    Derivation(String),
}

/// A clip identifier outside `[-_a-zA-Z0-9]+`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid file identifier {0:?}")]
pub struct FileIdError(pub String);
