//! Server-side request authentication.
//!
//! ## Verification Steps (in order)
//!
//! 1. **Shape**: header matches `HMAC v1 <digits> <token>`
//! 2. **Timestamp**: digits fit an `i64`
//! 3. **Encoding**: token is standard base64
//! 4. **MAC**: recomputed HMAC equals the token (constant time)
//! 5. **Freshness**: `|now - timestamp| <= max_request_age`
//!
//! Any signed request is replayable until its window elapses; there is no
//! nonce cache.

use hmac::Mac;
use std::time::Duration;

use crate::errors::AuthError;
use crate::secret::SharedSecret;
use crate::signer::keyed_mac;
use crate::token::{HeaderParser, RequestDescriptor};

/// Default freshness window.
pub const DEFAULT_MAX_REQUEST_AGE: Duration = Duration::from_secs(60);

/// Validates authorization headers against the server's shared secret.
///
/// Immutable after construction; share one instance (behind an `Arc`)
/// across all request handlers.
#[derive(Debug, Clone)]
pub struct Authenticator {
    secret: SharedSecret,
    max_request_age: Duration,
    parser: HeaderParser,
}

impl Authenticator {
    pub fn new(secret: SharedSecret, max_request_age: Duration) -> Self {
        Self {
            secret,
            max_request_age,
            parser: HeaderParser::new(),
        }
    }

    pub fn max_request_age(&self) -> Duration {
        self.max_request_age
    }

    /// Authorize one request.
    ///
    /// `path` is the raw request-target from the request line. `now` is the
    /// caller's clock reading in unix seconds.
    pub fn authorize(
        &self,
        header: Option<&str>,
        method: &str,
        path: &str,
        now: i64,
    ) -> Result<(), AuthError> {
        let parsed = self.parser.parse(header)?;

        let descriptor = RequestDescriptor::new(parsed.timestamp, method, path);
        // verify_slice compares in constant time
        keyed_mac(&self.secret, &descriptor)
            .verify_slice(&parsed.mac)
            .map_err(|_| AuthError::BadMac)?;

        let age = now.abs_diff(parsed.timestamp);
        let max_age = self.max_request_age.as_secs();
        if age > max_age {
            return Err(AuthError::Expired { age, max_age });
        }

        Ok(())
    }
}
