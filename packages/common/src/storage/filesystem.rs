use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};

use super::error::BlobError;
use super::handle::BlobHandle;
use super::traits::{BlobInfo, BlobMetadata, BlobStore, BoxReader};

/// Filesystem-backed blob store.
///
/// Blobs are stored in a sharded directory layout:
/// `{base_path}/{first 2 hex chars}/{remaining 30 hex chars}`, with a
/// `.json` sidecar holding the [`BlobInfo`].
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store.
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, BlobError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    /// Compute the filesystem path for a given handle.
    fn blob_path(&self, handle: &BlobHandle) -> PathBuf {
        self.base_path
            .join(handle.shard_prefix())
            .join(handle.shard_suffix())
    }

    fn info_path(&self, handle: &BlobHandle) -> PathBuf {
        self.blob_path(handle).with_extension("json")
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    async fn commit(&self, temp_path: &Path, target: &Path) -> Result<(), BlobError> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        if let Err(e) = fs::rename(temp_path, target).await {
            let _ = fs::remove_file(temp_path).await;
            return Err(e.into());
        }
        Ok(())
    }
}

async fn remove_if_present(path: &Path) -> Result<bool, BlobError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put_stream(
        &self,
        mut reader: BoxReader,
        metadata: BlobMetadata,
    ) -> Result<BlobHandle, BlobError> {
        let temp_path = self.temp_path();
        let mut hasher = Sha256::new();
        let mut total_bytes: u64 = 0;

        let mut buf = vec![0u8; 64 * 1024]; // 64KB read buffer
        let mut temp_file = fs::File::create(&temp_path).await?;

        loop {
            let n = match reader.read(&mut buf).await {
                Ok(n) => n,
                Err(e) => {
                    drop(temp_file);
                    let _ = fs::remove_file(&temp_path).await;
                    return Err(e.into());
                }
            };
            if n == 0 {
                break;
            }

            total_bytes += n as u64;
            if total_bytes > self.max_size {
                drop(temp_file);
                let _ = fs::remove_file(&temp_path).await;
                return Err(BlobError::SizeLimitExceeded {
                    actual: total_bytes,
                    limit: self.max_size,
                });
            }

            hasher.update(&buf[..n]);
            temp_file.write_all(&buf[..n]).await?;
        }

        temp_file.flush().await?;
        drop(temp_file);

        let handle = BlobHandle::generate();
        let info = BlobInfo {
            size: total_bytes,
            sha256: hex::encode(hasher.finalize()),
            metadata,
            created_at: Utc::now(),
        };

        // Payload first: a crash before the sidecar lands leaves bytes that
        // only `stat` cannot describe.
        self.commit(&temp_path, &self.blob_path(&handle)).await?;

        let info_temp = self.temp_path();
        fs::write(&info_temp, serde_json::to_vec(&info)?).await?;
        self.commit(&info_temp, &self.info_path(&handle)).await?;

        Ok(handle)
    }

    async fn get_stream(&self, handle: &BlobHandle) -> Result<BoxReader, BlobError> {
        let blob_path = self.blob_path(handle);
        match fs::File::open(&blob_path).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(handle.to_hex()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, handle: &BlobHandle) -> Result<bool, BlobError> {
        Ok(fs::try_exists(self.blob_path(handle)).await?)
    }

    async fn delete(&self, handle: &BlobHandle) -> Result<bool, BlobError> {
        let removed = remove_if_present(&self.blob_path(handle)).await?;
        remove_if_present(&self.info_path(handle)).await?;
        Ok(removed)
    }

    async fn stat(&self, handle: &BlobHandle) -> Result<BlobInfo, BlobError> {
        match fs::read(self.info_path(handle)).await {
            Ok(raw) => Ok(serde_json::from_slice(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(handle.to_hex()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
