//! Clip storage port.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use shared_auth::FileId;
use std::pin::Pin;
use tokio::io::AsyncRead;

use crate::domain::StoreError;

/// Readable clip contents.
pub type ClipReader = Pin<Box<dyn AsyncRead + Send>>;

/// Incoming clip body, chunk by chunk.
pub type ClipBody = BoxStream<'static, Result<Bytes, std::io::Error>>;

/// Where clips live. Identifiers are validated before a store sees them.
#[async_trait]
pub trait ClipStore: Send + Sync {
    /// Open an existing clip. [`StoreError::NotFound`] if absent.
    async fn open(&self, id: &FileId) -> Result<ClipReader, StoreError>;

    /// Store `body` under `id`, replacing any previous clip. Returns the
    /// number of bytes written.
    async fn create(&self, id: &FileId, body: ClipBody) -> Result<u64, StoreError>;
}
