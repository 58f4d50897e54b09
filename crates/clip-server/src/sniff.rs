//! Content-type detection from leading bytes.
//!
//! Signature table in the style of the WHATWG MIME sniffing algorithm:
//! markup, documents, images, audio/video, fonts, archives, then a
//! text-vs-binary fallback. Only the first [`SNIFF_LEN`] bytes are examined.

/// Bytes considered by [`detect_content_type`].
pub const SNIFF_LEN: usize = 512;

pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub const OCTET_STREAM: &str = "application/octet-stream";

enum Sig {
    /// Case-insensitive markup tag, after leading whitespace, followed by a
    /// space or `>`.
    Html(&'static [u8]),
    /// `data & mask == pattern`, optionally after leading whitespace.
    Masked {
        mask: &'static [u8],
        pattern: &'static [u8],
        skip_ws: bool,
        ct: &'static str,
    },
    Exact(&'static [u8], &'static str),
    Mp4,
}

const HTML: &str = "text/html; charset=utf-8";

const SIGNATURES: &[Sig] = &[
    Sig::Html(b"<!DOCTYPE HTML"),
    Sig::Html(b"<HTML"),
    Sig::Html(b"<HEAD"),
    Sig::Html(b"<SCRIPT"),
    Sig::Html(b"<IFRAME"),
    Sig::Html(b"<H1"),
    Sig::Html(b"<DIV"),
    Sig::Html(b"<FONT"),
    Sig::Html(b"<TABLE"),
    Sig::Html(b"<A"),
    Sig::Html(b"<STYLE"),
    Sig::Html(b"<TITLE"),
    Sig::Html(b"<B"),
    Sig::Html(b"<BODY"),
    Sig::Html(b"<BR"),
    Sig::Html(b"<P"),
    Sig::Html(b"<!--"),
    Sig::Masked {
        mask: b"\xFF\xFF\xFF\xFF\xFF",
        pattern: b"<?xml",
        skip_ws: true,
        ct: "text/xml; charset=utf-8",
    },
    Sig::Exact(b"%PDF-", "application/pdf"),
    Sig::Exact(b"%!PS-Adobe-", "application/postscript"),
    // Byte order marks
    Sig::Exact(b"\xFE\xFF", "text/plain; charset=utf-16be"),
    Sig::Exact(b"\xFF\xFE", "text/plain; charset=utf-16le"),
    Sig::Exact(b"\xEF\xBB\xBF", TEXT_PLAIN),
    // Images
    Sig::Exact(b"\x00\x00\x01\x00", "image/x-icon"),
    Sig::Exact(b"\x00\x00\x02\x00", "image/x-icon"),
    Sig::Exact(b"BM", "image/bmp"),
    Sig::Exact(b"GIF87a", "image/gif"),
    Sig::Exact(b"GIF89a", "image/gif"),
    Sig::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00WEBPVP",
        skip_ws: false,
        ct: "image/webp",
    },
    Sig::Exact(b"\x89PNG\x0D\x0A\x1A\x0A", "image/png"),
    Sig::Exact(b"\xFF\xD8\xFF", "image/jpeg"),
    // Audio and video
    Sig::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pattern: b"FORM\x00\x00\x00\x00AIFF",
        skip_ws: false,
        ct: "audio/aiff",
    },
    Sig::Masked {
        mask: b"\xFF\xFF\xFF",
        pattern: b"ID3",
        skip_ws: false,
        ct: "audio/mpeg",
    },
    Sig::Exact(b"OggS\x00", "application/ogg"),
    Sig::Exact(b"MThd\x00\x00\x00\x06", "audio/midi"),
    Sig::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00AVI ",
        skip_ws: false,
        ct: "video/avi",
    },
    Sig::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00WAVE",
        skip_ws: false,
        ct: "audio/wave",
    },
    Sig::Mp4,
    Sig::Exact(b"\x1A\x45\xDF\xA3", "video/webm"),
    // Fonts
    Sig::Exact(b"\x00\x01\x00\x00", "font/ttf"),
    Sig::Exact(b"OTTO", "font/otf"),
    Sig::Exact(b"ttcf", "font/collection"),
    Sig::Exact(b"wOFF", "font/woff"),
    Sig::Exact(b"wOF2", "font/woff2"),
    // Archives
    Sig::Exact(b"\x1F\x8B\x08", "application/x-gzip"),
    Sig::Exact(b"PK\x03\x04", "application/zip"),
    Sig::Exact(b"Rar!\x1A\x07\x00", "application/x-rar-compressed"),
    Sig::Exact(b"Rar!\x1A\x07\x01\x00", "application/x-rar-compressed"),
    Sig::Exact(b"\x00\x61\x73\x6D", "application/wasm"),
];

fn is_ws(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

fn skip_ws(data: &[u8]) -> &[u8] {
    let start = data.iter().position(|&b| !is_ws(b)).unwrap_or(data.len());
    &data[start..]
}

impl Sig {
    fn matches(&self, data: &[u8]) -> Option<&'static str> {
        match self {
            Sig::Html(tag) => {
                let data = skip_ws(data);
                if data.len() < tag.len() + 1 {
                    return None;
                }
                let head_matches = tag
                    .iter()
                    .zip(data)
                    .all(|(t, d)| if t.is_ascii_uppercase() { d & 0xDF == *t } else { d == t });
                let terminated = matches!(data[tag.len()], b' ' | b'>');
                (head_matches && terminated).then_some(HTML)
            }
            Sig::Masked {
                mask,
                pattern,
                skip_ws: skip,
                ct,
            } => {
                let data = if *skip { skip_ws(data) } else { data };
                if data.len() < pattern.len() {
                    return None;
                }
                let hit = pattern
                    .iter()
                    .zip(mask.iter())
                    .zip(data)
                    .all(|((p, m), d)| d & m == *p);
                hit.then_some(*ct)
            }
            Sig::Exact(prefix, ct) => data.starts_with(prefix).then_some(*ct),
            Sig::Mp4 => is_mp4(data).then_some("video/mp4"),
        }
    }
}

fn is_mp4(data: &[u8]) -> bool {
    if data.len() < 12 {
        return false;
    }
    let box_size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if data.len() < box_size || box_size % 4 != 0 || &data[4..8] != b"ftyp" {
        return false;
    }
    // Brands start at 8; offset 12 holds the minor version.
    (8..box_size)
        .step_by(4)
        .filter(|&st| st != 12)
        .any(|st| data.get(st..st + 3) == Some(b"mp4".as_slice()))
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

/// Best-guess MIME type of `data`. Always returns a valid type.
pub fn detect_content_type(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(SNIFF_LEN)];
    SIGNATURES
        .iter()
        .find_map(|sig| sig.matches(data))
        .unwrap_or_else(|| {
            if data.iter().copied().any(is_binary_byte) {
                OCTET_STREAM
            } else {
                TEXT_PLAIN
            }
        })
}

/// Conventional file extension for a media type, without parameters.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let ext = match essence.as_str() {
        "text/plain" => ".txt",
        "text/html" => ".html",
        "text/xml" => ".xml",
        "application/pdf" => ".pdf",
        "application/postscript" => ".ps",
        "image/x-icon" => ".ico",
        "image/bmp" => ".bmp",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/png" => ".png",
        "image/jpeg" => ".jpg",
        "audio/aiff" => ".aiff",
        "audio/mpeg" => ".mp3",
        "application/ogg" => ".ogg",
        "audio/midi" => ".mid",
        "video/avi" => ".avi",
        "audio/wave" => ".wav",
        "video/mp4" => ".mp4",
        "video/webm" => ".webm",
        "font/ttf" => ".ttf",
        "font/otf" => ".otf",
        "font/collection" => ".ttc",
        "font/woff" => ".woff",
        "font/woff2" => ".woff2",
        "application/x-gzip" => ".gz",
        "application/zip" => ".zip",
        "application/x-rar-compressed" => ".rar",
        "application/wasm" => ".wasm",
        _ => return None,
    };
    Some(ext)
}
