use std::io::Cursor;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use super::error::BlobError;
use super::handle::BlobHandle;
use super::traits::{BlobInfo, BlobMetadata, BlobStore, BoxReader};

/// In-process blob store for tests and single-node development.
pub struct MemoryBlobStore {
    blobs: DashMap<BlobHandle, (Vec<u8>, BlobInfo)>,
    max_size: u64,
}

impl MemoryBlobStore {
    pub fn new(max_size: u64) -> Self {
        Self {
            blobs: DashMap::new(),
            max_size,
        }
    }

    /// Number of blobs currently held.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new(u64::MAX)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, data: &[u8], metadata: BlobMetadata) -> Result<BlobHandle, BlobError> {
        if data.len() as u64 > self.max_size {
            return Err(BlobError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let handle = BlobHandle::generate();
        let info = BlobInfo {
            size: data.len() as u64,
            sha256: hex::encode(Sha256::digest(data)),
            metadata,
            created_at: Utc::now(),
        };
        self.blobs.insert(handle, (data.to_vec(), info));
        Ok(handle)
    }

    async fn put_stream(
        &self,
        mut reader: BoxReader,
        metadata: BlobMetadata,
    ) -> Result<BlobHandle, BlobError> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        self.put(&buf, metadata).await
    }

    async fn get(&self, handle: &BlobHandle) -> Result<Vec<u8>, BlobError> {
        self.blobs
            .get(handle)
            .map(|entry| entry.0.clone())
            .ok_or_else(|| BlobError::NotFound(handle.to_hex()))
    }

    async fn get_stream(&self, handle: &BlobHandle) -> Result<BoxReader, BlobError> {
        let data = self.get(handle).await?;
        Ok(Box::new(Cursor::new(data)))
    }

    async fn exists(&self, handle: &BlobHandle) -> Result<bool, BlobError> {
        Ok(self.blobs.contains_key(handle))
    }

    async fn delete(&self, handle: &BlobHandle) -> Result<bool, BlobError> {
        Ok(self.blobs.remove(handle).is_some())
    }

    async fn stat(&self, handle: &BlobHandle) -> Result<BlobInfo, BlobError> {
        self.blobs
            .get(handle)
            .map(|entry| entry.1.clone())
            .ok_or_else(|| BlobError::NotFound(handle.to_hex()))
    }
}
