use std::io::Cursor;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::BlobError;
use super::handle::BlobHandle;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Caller-supplied description of a payload, kept next to the bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMetadata {
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

impl BlobMetadata {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            content_type: Some(content_type.into()),
        }
    }
}

/// What the store knows about a blob besides its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobInfo {
    pub size: u64,
    /// Hex-encoded SHA-256 of the payload.
    pub sha256: String,
    pub metadata: BlobMetadata,
    pub created_at: DateTime<Utc>,
}

/// Handle-addressed blob storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes and return a fresh handle.
    async fn put(&self, data: &[u8], metadata: BlobMetadata) -> Result<BlobHandle, BlobError> {
        let reader: BoxReader = Box::new(Cursor::new(data.to_vec()));
        self.put_stream(reader, metadata).await
    }

    /// Store data from an async reader and return a fresh handle.
    async fn put_stream(
        &self,
        reader: BoxReader,
        metadata: BlobMetadata,
    ) -> Result<BlobHandle, BlobError>;

    /// Retrieve all bytes for a blob.
    async fn get(&self, handle: &BlobHandle) -> Result<Vec<u8>, BlobError> {
        let mut reader = self.get_stream(handle).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Retrieve a blob as a streaming async reader.
    async fn get_stream(&self, handle: &BlobHandle) -> Result<BoxReader, BlobError>;

    /// Check whether a blob exists.
    async fn exists(&self, handle: &BlobHandle) -> Result<bool, BlobError>;

    /// Delete a blob.
    ///
    /// Idempotent: returns `true` if the blob was deleted, `false` if it did
    /// not exist.
    async fn delete(&self, handle: &BlobHandle) -> Result<bool, BlobError>;

    /// Size, digest and metadata of a stored blob.
    async fn stat(&self, handle: &BlobHandle) -> Result<BlobInfo, BlobError>;
}
