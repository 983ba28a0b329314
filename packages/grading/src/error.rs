use common::storage::BlobError;
use sea_orm::DbErr;
use thiserror::Error;

/// A backing store failed. Propagated unchanged from repository to caller.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] DbErr),
    #[error("blob store error: {0}")]
    Blob(#[from] BlobError),
    #[error("document encoding error: {0}")]
    Document(#[from] serde_json::Error),
}

/// A caller-supplied value is outside its domain range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ServiceError {
    /// Machine-readable code. One of `VALIDATION_ERROR`, `NOT_FOUND` or
    /// `INTERNAL_ERROR`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Storage(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<BlobError> for ServiceError {
    fn from(err: BlobError) -> Self {
        Self::Storage(StorageError::Blob(err))
    }
}

/// Failure while assembling the stack at startup.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("database error: {0}")]
    Database(#[from] DbErr),
    #[error("blob store error: {0}")]
    Blob(#[from] BlobError),
    #[error("unsupported database kind: {0}")]
    UnsupportedDatabase(String),
}
