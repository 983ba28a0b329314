use std::sync::Arc;

use common::storage::{BlobError, BlobMetadata, BlobStore};

use crate::models::ContentRef;

/// Decides where a payload lives and moves bytes in and out of it.
///
/// Payloads of at most `inline_max_bytes` stay on the metadata record; larger
/// ones go to the blob store. An `inline_max_bytes` of 0 disables inlining.
#[derive(Clone)]
pub struct PayloadStore {
    blobs: Arc<dyn BlobStore>,
    inline_max_bytes: u64,
}

impl PayloadStore {
    pub fn new(blobs: Arc<dyn BlobStore>, inline_max_bytes: u64) -> Self {
        Self {
            blobs,
            inline_max_bytes,
        }
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    fn should_inline(&self, len: usize) -> bool {
        self.inline_max_bytes > 0 && len as u64 <= self.inline_max_bytes
    }

    pub async fn write(
        &self,
        data: &[u8],
        metadata: BlobMetadata,
    ) -> Result<ContentRef, BlobError> {
        if self.should_inline(data.len()) {
            return Ok(ContentRef::Inline(data.to_vec()));
        }
        let handle = self.blobs.put(data, metadata).await?;
        Ok(ContentRef::Handle(handle))
    }

    pub async fn read(&self, content: &ContentRef) -> Result<Vec<u8>, BlobError> {
        match content {
            ContentRef::Handle(handle) => self.blobs.get(handle).await,
            ContentRef::Inline(bytes) => Ok(bytes.clone()),
        }
    }

    /// Remove the payload if it lives in the blob store. Missing blobs are fine.
    pub async fn discard(&self, content: &ContentRef) -> Result<(), BlobError> {
        if let ContentRef::Handle(handle) = content {
            self.blobs.delete(handle).await?;
        }
        Ok(())
    }
}
