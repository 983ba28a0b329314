use std::path::PathBuf;

use serde::Deserialize;

/// Blob storage configuration shared by every service that reads or writes
/// payloads.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// One of `"filesystem"`, `"memory"` or `"s3"`. Default: "filesystem".
    #[serde(default = "default_storage_backend")]
    pub backend: String,
    /// Root directory for the filesystem backend. Default: "./data/blobs".
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
    /// Largest accepted payload in bytes. Default: 128 MiB.
    #[serde(default = "default_max_blob_size")]
    pub max_blob_size: u64,
    /// Payloads of at most this many bytes are stored inline on the metadata
    /// record instead of the blob store. Default: 0 (never inline).
    #[serde(default)]
    pub inline_max_bytes: u64,
    /// Required when `backend = "s3"`.
    #[serde(default)]
    pub s3: Option<S3Config>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct S3Config {
    pub bucket: String,
    #[serde(default = "default_s3_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible services such as MinIO.
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Use path-style addressing (`{endpoint}/{bucket}/{key}`). Default: true.
    #[serde(default = "default_path_style")]
    pub path_style: bool,
}

fn default_storage_backend() -> String {
    "filesystem".into()
}
fn default_storage_path() -> PathBuf {
    PathBuf::from("./data/blobs")
}
fn default_max_blob_size() -> u64 {
    128 * 1024 * 1024
}
fn default_s3_region() -> String {
    "us-east-1".into()
}
fn default_path_style() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            path: default_storage_path(),
            max_blob_size: default_max_blob_size(),
            inline_max_bytes: 0,
            s3: None,
        }
    }
}

impl StorageConfig {
    /// Process-local storage, used by tests and the `memory` database kind.
    pub fn in_memory() -> Self {
        Self {
            backend: "memory".into(),
            ..Self::default()
        }
    }
}
