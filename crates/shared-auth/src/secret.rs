//! Shared secret and salt.
//!
//! The server generates a [`Salt`] once at setup and publishes it through
//! discovery. Both sides run the operator's passphrase through
//! [`derive_secret`] with that salt and arrive at the same [`SharedSecret`].

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use std::fmt;
use zeroize::Zeroizing;

use crate::errors::SecretError;

/// Salt length produced by [`Salt::generate`].
pub const SALT_LEN: usize = 32;

/// Derived secret length.
pub const SECRET_LEN: usize = 32;

const DERIVATION_INFO: &[u8] = b"clipshare v1 shared secret";

/// Key material for request MACs. Wiped from memory on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret(Zeroizing<Vec<u8>>);

impl SharedSecret {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, SecretError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(SecretError::Empty("shared secret"));
        }
        Ok(Self(Zeroizing::new(bytes)))
    }

    /// Decode a secret stored as standard base64.
    pub fn from_base64(encoded: &str) -> Result<Self, SecretError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| SecretError::InvalidEncoding(e.to_string()))?;
        Self::from_bytes(bytes)
    }

    /// Standard base64 form for configuration files.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0.as_slice())
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedSecret([REDACTED; {}])", self.0.len())
    }
}

/// Random, public, per-server salt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Salt(Vec<u8>);

impl Salt {
    /// Generate a fresh salt from the OS random source.
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; SALT_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Wrap existing salt bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, SecretError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(SecretError::Empty("salt"));
        }
        Ok(Self(bytes))
    }

    /// Decode a salt in standard base64, as served by discovery.
    pub fn from_base64(encoded: &str) -> Result<Self, SecretError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| SecretError::InvalidEncoding(e.to_string()))?;
        Self::from_bytes(bytes)
    }

    /// Standard base64 form.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    /// Raw salt bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Derive the shared secret from a passphrase and the server's salt.
///
/// HKDF-SHA256 with a fixed info string; the same inputs always give the
/// same secret on client and server.
pub fn derive_secret(passphrase: &str, salt: &Salt) -> Result<SharedSecret, SecretError> {
    if passphrase.is_empty() {
        return Err(SecretError::Empty("passphrase"));
    }

    let hk = Hkdf::<Sha256>::new(Some(salt.as_bytes()), passphrase.as_bytes());
    let mut okm = Zeroizing::new(vec![0u8; SECRET_LEN]);
    hk.expand(DERIVATION_INFO, &mut okm)
        .map_err(|e| SecretError::Derivation(e.to_string()))?;

    Ok(SharedSecret(okm))
}
