mod error;
mod handle;
mod traits;

pub mod filesystem;
pub mod memory;
#[cfg(feature = "object-storage")]
pub mod s3;

use std::sync::Arc;

pub use error::BlobError;
pub use handle::BlobHandle;
pub use traits::{BlobInfo, BlobMetadata, BlobStore, BoxReader};

use crate::config::StorageConfig;

/// Build the blob store selected by `config.backend`.
pub async fn open_blob_store(config: &StorageConfig) -> Result<Arc<dyn BlobStore>, BlobError> {
    match config.backend.as_str() {
        "filesystem" => Ok(Arc::new(
            filesystem::FilesystemBlobStore::new(config.path.clone(), config.max_blob_size)
                .await?,
        )),
        "memory" => Ok(Arc::new(memory::MemoryBlobStore::new(config.max_blob_size))),
        #[cfg(feature = "object-storage")]
        "s3" => {
            let s3_config = config
                .s3
                .as_ref()
                .ok_or_else(|| BlobError::Config("storage.s3 section is required".into()))?;
            Ok(Arc::new(s3::S3BlobStore::new(s3_config, config.max_blob_size)?))
        }
        #[cfg(not(feature = "object-storage"))]
        "s3" => Err(BlobError::Config(
            "s3 backend requires the `object-storage` feature".into(),
        )),
        other => Err(BlobError::Config(format!(
            "unsupported storage backend: {other}"
        ))),
    }
}
