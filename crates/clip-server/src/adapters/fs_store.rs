//! Filesystem clip storage: one file per clip under the cache directory.

use async_trait::async_trait;
use futures::StreamExt;
use shared_auth::FileId;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::domain::StoreError;
use crate::ports::{ClipBody, ClipReader, ClipStore};

#[derive(Debug, Clone)]
pub struct FsClipStore {
    dir: PathBuf,
    max_size: u64,
}

impl FsClipStore {
    pub fn new(dir: impl Into<PathBuf>, max_size: u64) -> Self {
        Self {
            dir: dir.into(),
            max_size,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, id: &FileId) -> PathBuf {
        self.dir.join(id.as_str())
    }

    /// A staging file unique to one upload. Identifiers never contain '.',
    /// so staging names cannot collide with stored clips.
    fn staging_path(&self, id: &FileId) -> PathBuf {
        let nonce: u64 = rand::random();
        self.dir
            .join(format!(".{}.{:016x}.partial", id.as_str(), nonce))
    }

    async fn ensure_dir(&self) -> Result<(), StoreError> {
        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o700);
        builder.create(&self.dir).await?;
        Ok(())
    }

    async fn write_staged(&self, staging: &Path, mut body: ClipBody) -> Result<u64, StoreError> {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(staging)
            .await?;
        let mut written: u64 = 0;
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| StoreError::Body(e.to_string()))?;
            written += chunk.len() as u64;
            if written > self.max_size {
                return Err(StoreError::TooLarge {
                    limit: self.max_size,
                });
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }
}

#[async_trait]
impl ClipStore for FsClipStore {
    async fn open(&self, id: &FileId) -> Result<ClipReader, StoreError> {
        match tokio::fs::File::open(self.path(id)).await {
            Ok(file) => Ok(Box::pin(file)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(id.as_str().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn create(&self, id: &FileId, body: ClipBody) -> Result<u64, StoreError> {
        self.ensure_dir().await?;
        let staging = self.staging_path(id);

        match self.write_staged(&staging, body).await {
            Ok(written) => {
                tokio::fs::rename(&staging, self.path(id)).await?;
                debug!(id = %id, bytes = written, "Clip stored");
                Ok(written)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&staging).await;
                Err(e)
            }
        }
    }
}
