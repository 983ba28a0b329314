use std::io::Cursor;

use async_trait::async_trait;
use chrono::Utc;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::region::Region;
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use super::error::BlobError;
use super::handle::BlobHandle;
use super::traits::{BlobInfo, BlobMetadata, BlobStore, BoxReader};
use crate::config::S3Config;

/// S3-compatible object storage backend (AWS, MinIO, Garage, ...).
///
/// Objects live under `blobs/{prefix}/{suffix}` with the [`BlobInfo`]
/// stored as a JSON object next to them.
pub struct S3BlobStore {
    bucket: Box<Bucket>,
    max_size: u64,
}

fn backend(err: impl std::fmt::Display) -> BlobError {
    BlobError::Backend(err.to_string())
}

impl S3BlobStore {
    pub fn new(config: &S3Config, max_size: u64) -> Result<Self, BlobError> {
        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .region
                .parse()
                .map_err(|e| BlobError::Config(format!("invalid S3 region: {e}")))?,
        };

        let credentials = Credentials::new(
            config.access_key.as_deref(),
            config.secret_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| BlobError::Config(format!("invalid S3 credentials: {e}")))?;

        let mut bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| BlobError::Config(format!("invalid S3 bucket: {e}")))?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self { bucket, max_size })
    }

    fn object_key(handle: &BlobHandle) -> String {
        format!("blobs/{}/{}", handle.shard_prefix(), handle.shard_suffix())
    }

    fn info_key(handle: &BlobHandle) -> String {
        format!("{}.json", Self::object_key(handle))
    }

    async fn fetch(&self, key: &str, handle: &BlobHandle) -> Result<Vec<u8>, BlobError> {
        let response = self.bucket.get_object(key).await.map_err(backend)?;
        match response.status_code() {
            200..=299 => Ok(response.bytes().to_vec()),
            404 => Err(BlobError::NotFound(handle.to_hex())),
            status => Err(BlobError::Backend(format!(
                "GET {key} returned status {status}"
            ))),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, data: &[u8], metadata: BlobMetadata) -> Result<BlobHandle, BlobError> {
        if data.len() as u64 > self.max_size {
            return Err(BlobError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let handle = BlobHandle::generate();
        let content_type = metadata
            .content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".into());
        let info = BlobInfo {
            size: data.len() as u64,
            sha256: hex::encode(Sha256::digest(data)),
            metadata,
            created_at: Utc::now(),
        };

        let key = Self::object_key(&handle);
        let response = self
            .bucket
            .put_object_with_content_type(&key, data, &content_type)
            .await
            .map_err(backend)?;
        if !(200..300).contains(&response.status_code()) {
            return Err(BlobError::Backend(format!(
                "PUT {key} returned status {}",
                response.status_code()
            )));
        }

        let info_key = Self::info_key(&handle);
        let response = self
            .bucket
            .put_object_with_content_type(&info_key, &serde_json::to_vec(&info)?, "application/json")
            .await
            .map_err(backend)?;
        if !(200..300).contains(&response.status_code()) {
            return Err(BlobError::Backend(format!(
                "PUT {info_key} returned status {}",
                response.status_code()
            )));
        }

        Ok(handle)
    }

    async fn put_stream(
        &self,
        reader: BoxReader,
        metadata: BlobMetadata,
    ) -> Result<BlobHandle, BlobError> {
        // One byte past the limit is enough to detect an oversized payload.
        let mut limited = reader.take(self.max_size.saturating_add(1));
        let mut buf = Vec::new();
        limited.read_to_end(&mut buf).await?;
        self.put(&buf, metadata).await
    }

    async fn get(&self, handle: &BlobHandle) -> Result<Vec<u8>, BlobError> {
        self.fetch(&Self::object_key(handle), handle).await
    }

    async fn get_stream(&self, handle: &BlobHandle) -> Result<BoxReader, BlobError> {
        let data = self.get(handle).await?;
        Ok(Box::new(Cursor::new(data)))
    }

    async fn exists(&self, handle: &BlobHandle) -> Result<bool, BlobError> {
        match self.bucket.head_object(Self::object_key(handle)).await {
            Ok((_, status)) if (200..300).contains(&status) => Ok(true),
            Ok((_, 404)) => Ok(false),
            Ok((_, status)) => Err(BlobError::Backend(format!(
                "HEAD returned status {status}"
            ))),
            Err(e) => Err(backend(e)),
        }
    }

    async fn delete(&self, handle: &BlobHandle) -> Result<bool, BlobError> {
        let existed = self.exists(handle).await?;
        // S3 deletes are idempotent; a missing key still answers 204.
        self.bucket
            .delete_object(Self::object_key(handle))
            .await
            .map_err(backend)?;
        self.bucket
            .delete_object(Self::info_key(handle))
            .await
            .map_err(backend)?;
        Ok(existed)
    }

    async fn stat(&self, handle: &BlobHandle) -> Result<BlobInfo, BlobError> {
        let raw = self.fetch(&Self::info_key(handle), handle).await?;
        Ok(serde_json::from_slice(&raw)?)
    }
}
