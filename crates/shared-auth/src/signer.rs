//! Client-side request signing.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::clock::{SystemTimeSource, TimeSource};
use crate::secret::SharedSecret;
use crate::token::{AuthorizationToken, RequestDescriptor};

pub(crate) type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 state keyed with `secret` and fed the descriptor bytes.
/// Signing finalizes it; authentication verifies against it.
pub(crate) fn keyed_mac(secret: &SharedSecret, descriptor: &RequestDescriptor<'_>) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(&descriptor.to_bytes());
    mac
}

/// HMAC-SHA256 of a descriptor under `secret`.
pub fn compute_mac(secret: &SharedSecret, descriptor: &RequestDescriptor<'_>) -> [u8; 32] {
    keyed_mac(secret, descriptor).finalize().into_bytes().into()
}

/// Signs outbound requests.
///
/// Reads the clock once per call and nothing else; given a fixed clock the
/// output is fully deterministic.
#[derive(Debug, Clone)]
pub struct Signer<T: TimeSource = SystemTimeSource> {
    secret: SharedSecret,
    clock: T,
}

impl Signer<SystemTimeSource> {
    /// Signer on the system clock.
    pub fn with_system_clock(secret: SharedSecret) -> Self {
        Self::new(secret, SystemTimeSource)
    }
}

impl<T: TimeSource> Signer<T> {
    pub fn new(secret: SharedSecret, clock: T) -> Self {
        Self { secret, clock }
    }

    /// Sign `method path` at the current clock reading.
    pub fn sign(&self, method: &str, path: &str) -> AuthorizationToken {
        self.sign_at(method, path, self.clock.now_unix())
    }

    /// Sign `method path` at an explicit timestamp.
    pub fn sign_at(&self, method: &str, path: &str, timestamp: i64) -> AuthorizationToken {
        let descriptor = RequestDescriptor::new(timestamp, method, path);
        AuthorizationToken::new(timestamp, compute_mac(&self.secret, &descriptor))
    }
}
