//! Clip identifiers.

use std::fmt;

use crate::errors::FileIdError;

/// Opaque storage key, restricted to `[-_a-zA-Z0-9]+`.
///
/// Anything that could name a path component (`.`, `/`, whitespace, percent
/// escapes) is rejected before it reaches storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileId(String);

impl FileId {
    /// Longest identifier accepted.
    pub const MAX_LEN: usize = 128;

    pub fn parse(id: &str) -> Result<Self, FileIdError> {
        let valid = !id.is_empty()
            && id.len() <= Self::MAX_LEN
            && id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');

        if valid {
            Ok(Self(id.to_string()))
        } else {
            Err(FileIdError(id.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Request path for this clip: `/clip/<id>`.
    pub fn clip_path(&self) -> String {
        format!("/clip/{}", self.0)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FileId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
