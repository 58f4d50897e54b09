//! Wire format of the `Authorization` header.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use regex::Regex;
use std::fmt;

use crate::errors::AuthError;

/// Scheme prefix of every authorization header.
pub const SCHEME: &str = "HMAC v1";

/// The canonical bytes covered by the MAC: `timestamp:method:path`.
///
/// `path` is the request-target exactly as it appears on the request line,
/// minus any query string or fragment. It is never percent-decoded or
/// normalized, so client and server see identical bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestDescriptor<'a> {
    timestamp: i64,
    method: &'a str,
    path: &'a str,
}

impl<'a> RequestDescriptor<'a> {
    pub fn new(timestamp: i64, method: &'a str, target: &'a str) -> Self {
        Self {
            timestamp,
            method,
            path: strip_query(target),
        }
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn method(&self) -> &str {
        self.method
    }

    pub fn path(&self) -> &str {
        self.path
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for RequestDescriptor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.timestamp, self.method, self.path)
    }
}

fn strip_query(target: &str) -> &str {
    match target.find(['?', '#']) {
        Some(idx) => &target[..idx],
        None => target,
    }
}

/// A signed token for exactly one request. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationToken {
    timestamp: i64,
    mac: [u8; 32],
}

impl AuthorizationToken {
    pub fn new(timestamp: i64, mac: [u8; 32]) -> Self {
        Self { timestamp, mac }
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn mac(&self) -> &[u8; 32] {
        &self.mac
    }

    /// `HMAC v1 <timestamp> <base64-mac>`
    pub fn header_value(&self) -> String {
        format!("{} {} {}", SCHEME, self.timestamp, STANDARD.encode(self.mac))
    }
}

impl fmt::Display for AuthorizationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header_value())
    }
}

impl fmt::Debug for AuthorizationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationToken")
            .field("timestamp", &self.timestamp)
            .field("mac", &STANDARD.encode(self.mac))
            .finish()
    }
}

/// Header fields after syntactic validation, before any MAC check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHeader {
    pub timestamp: i64,
    pub mac: Vec<u8>,
}

/// Parses authorization headers.
///
/// The pattern is compiled once in [`HeaderParser::new`]; the parser is then
/// shared read-only across concurrent requests.
#[derive(Debug, Clone)]
pub struct HeaderParser {
    pattern: Regex,
}

impl HeaderParser {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"^HMAC v1 ([0-9]+) (.+)$").expect("static header pattern"),
        }
    }

    /// Parse `HMAC v1 <digits> <token>`.
    ///
    /// Each failure maps to its own [`AuthError`] variant, in this order:
    /// shape, timestamp range, base64.
    pub fn parse(&self, header: Option<&str>) -> Result<ParsedHeader, AuthError> {
        let captures = header
            .and_then(|h| self.pattern.captures(h))
            .ok_or(AuthError::MissingHeader)?;

        let digits = &captures[1];
        let timestamp = digits
            .parse::<i64>()
            .map_err(|_| AuthError::BadTimestamp(digits.to_string()))?;

        let mac = STANDARD
            .decode(&captures[2])
            .map_err(|e| AuthError::BadEncoding(e.to_string()))?;

        Ok(ParsedHeader { timestamp, mac })
    }
}

impl Default for HeaderParser {
    fn default() -> Self {
        Self::new()
    }
}
