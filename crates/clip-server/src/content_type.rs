//! Response headers for a streamed clip, decided from its first chunk.

use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue};

use crate::sniff::{detect_content_type, extension_for, OCTET_STREAM};

/// Sniffs the first chunk written through it and derives headers.
///
/// Inline responses never carry `text/html` (rendered as `text/plain`
/// instead) and omit `application/octet-stream`. Downloads keep the sniffed
/// type and add `Content-Disposition: attachment` with an inferred
/// extension.
#[derive(Debug)]
pub struct ContentTypeWriter {
    filename: String,
    download: bool,
    sniffed: bool,
}

impl ContentTypeWriter {
    pub fn new(filename: impl Into<String>, download: bool) -> Self {
        Self {
            filename: filename.into(),
            download,
            sniffed: false,
        }
    }

    /// Headers for the response whose body starts with `first`. Returns
    /// `None` on every call after the first.
    pub fn observe(&mut self, first: &[u8]) -> Option<HeaderMap> {
        if self.sniffed {
            return None;
        }
        self.sniffed = true;

        let mut headers = HeaderMap::new();
        let detected = detect_content_type(first);

        let content_type = if self.download {
            Some(detected.to_string())
        } else if detected.starts_with("text/html") {
            Some(detected.replace("text/html", "text/plain"))
        } else if detected == OCTET_STREAM {
            None
        } else {
            Some(detected.to_string())
        };

        if let Some(value) = content_type.and_then(|ct| HeaderValue::from_str(&ct).ok()) {
            headers.insert(CONTENT_TYPE, value);
        }

        if self.download {
            let mut filename = self.filename.clone();
            if let Some(ext) = extension_for(detected) {
                if !filename.ends_with(ext) {
                    filename.push_str(ext);
                }
            }
            let disposition = format!("attachment; filename=\"{}\"", filename.replace('"', ""));
            if let Ok(value) = HeaderValue::from_str(&disposition) {
                headers.insert(CONTENT_DISPOSITION, value);
            }
        }

        Some(headers)
    }
}
