//! On-disk storage of a pinned certificate chain.

use std::fs;
use std::path::{Path, PathBuf};

use rustls::pki_types::CertificateDer;
use shared_auth::{write_private, PinnedCertificate};
use tracing::debug;

use crate::errors::PinError;
use crate::pem::parse_certificates;

/// A pinned chain plus the file it lives in.
#[derive(Debug, Clone)]
pub struct PinFile {
    path: PathBuf,
}

impl PinFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the chain, readable only by the owner.
    pub fn write(&self, pinned: &PinnedCertificate) -> Result<(), PinError> {
        write_private(&self.path, pinned.as_pem().as_bytes())?;
        debug!(path = %self.path.display(), blocks = pinned.block_count(), "Pinned certificate written");
        Ok(())
    }

    /// Read the pin back as PEM text.
    pub fn load(&self) -> Result<PinnedCertificate, PinError> {
        let pem = fs::read_to_string(&self.path)?;
        self.check(&pem)?;
        PinnedCertificate::from_pem(pem).ok_or_else(|| self.no_certificates())
    }

    /// Read the pin and decode it to DER.
    pub fn load_der(&self) -> Result<Vec<CertificateDer<'static>>, PinError> {
        let pem = fs::read_to_string(&self.path)?;
        self.check(&pem)
    }

    fn check(&self, pem: &str) -> Result<Vec<CertificateDer<'static>>, PinError> {
        let certs = parse_certificates(pem)?;
        if certs.is_empty() {
            return Err(self.no_certificates());
        }
        Ok(certs)
    }

    fn no_certificates(&self) -> PinError {
        PinError::NoCertificates(self.path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pem::encode_certificates;

    fn sample_pin() -> PinnedCertificate {
        let cert = rcgen::generate_simple_self_signed(vec!["clipshare".to_string()]).unwrap();
        PinnedCertificate::from_pem(encode_certificates(&[cert.cert.der().clone()])).unwrap()
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = PinFile::new(dir.path().join("nested").join("server.pem"));
        let pin = sample_pin();

        file.write(&pin).unwrap();

        assert_eq!(file.load().unwrap(), pin);
        assert_eq!(file.load_der().unwrap().len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_pin_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let file = PinFile::new(dir.path().join("server.pem"));
        file.write(&sample_pin()).unwrap();

        let mode = fs::metadata(file.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_load_rejects_file_without_certificates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.pem");
        fs::write(&path, "garbage").unwrap();

        let err = PinFile::new(&path).load().unwrap_err();
        assert!(matches!(err, PinError::NoCertificates(_)));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PinFile::new(dir.path().join("absent.pem")).load().unwrap_err();
        assert!(matches!(err, PinError::Io(_)));
    }
}
