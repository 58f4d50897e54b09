//! PEM encoding of certificate chains.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rustls::pki_types::CertificateDer;

const LINE_WIDTH: usize = 64;

/// Encode DER certificates as concatenated `CERTIFICATE` blocks.
pub fn encode_certificates(chain: &[CertificateDer<'_>]) -> String {
    let mut out = String::new();
    for cert in chain {
        let body = STANDARD.encode(cert.as_ref());
        out.push_str("-----BEGIN CERTIFICATE-----\n");
        for line in body.as_bytes().chunks(LINE_WIDTH) {
            // base64 output is pure ASCII
            out.push_str(&String::from_utf8_lossy(line));
            out.push('\n');
        }
        out.push_str("-----END CERTIFICATE-----\n");
    }
    out
}

/// Parse every `CERTIFICATE` block in `pem`. Other block types are skipped.
pub fn parse_certificates(pem: &str) -> std::io::Result<Vec<CertificateDer<'static>>> {
    let mut reader = std::io::BufReader::new(pem.as_bytes());
    rustls_pemfile::certs(&mut reader).collect()
}
