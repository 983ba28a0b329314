use thiserror::Error;

/// Errors that can occur during blob storage operations.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The requested blob was not found.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// The provided blob handle is not well-formed.
    #[error("invalid blob handle: {0}")]
    InvalidHandle(String),

    /// The blob exceeds the configured size limit.
    #[error("blob exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },

    /// An I/O error occurred.
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A remote object store rejected or failed the request.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// The blob store could not be built from its configuration.
    #[error("storage configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for BlobError {
    fn from(err: serde_json::Error) -> Self {
        Self::Backend(format!("blob info encoding: {err}"))
    }
}
