//! File layout of a ClipShare configuration directory.

use std::path::{Path, PathBuf};

/// Every file `setup` and `join` write, relative to one directory.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    dir: PathBuf,
}

impl ConfigPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `$HOME/.config/clipshare`, or `./.clipshare` without a home directory.
    pub fn default_dir() -> PathBuf {
        match std::env::var_os("HOME") {
            Some(home) if !home.is_empty() => PathBuf::from(home).join(".config").join("clipshare"),
            _ => PathBuf::from(".clipshare"),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn server_config(&self) -> PathBuf {
        self.dir.join("server.toml")
    }

    pub fn server_cert(&self) -> PathBuf {
        self.dir.join("server.crt")
    }

    pub fn server_key(&self) -> PathBuf {
        self.dir.join("server.key")
    }

    pub fn clips_dir(&self) -> PathBuf {
        self.dir.join("clips")
    }

    pub fn client_config(&self) -> PathBuf {
        self.dir.join("client.toml")
    }

    pub fn pinned_cert(&self) -> PathBuf {
        self.dir.join("server.pem")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_live_in_one_directory() {
        let paths = ConfigPaths::new("/tmp/cs");
        for file in [
            paths.server_config(),
            paths.server_cert(),
            paths.server_key(),
            paths.client_config(),
            paths.pinned_cert(),
        ] {
            assert_eq!(file.parent(), Some(Path::new("/tmp/cs")));
        }
    }
}
