use std::sync::Arc;

use tracing::info;

use super::{MemoryRepository, PayloadStore, PostgresRepository, Repository};
use crate::config::DatabaseConfig;
use crate::error::SetupError;

/// Build the repository selected by `config.kind`.
pub async fn build_repository(
    config: &DatabaseConfig,
    payloads: PayloadStore,
) -> Result<Arc<dyn Repository>, SetupError> {
    match config.kind.as_str() {
        "postgres" => {
            let repository = PostgresRepository::connect(config, payloads).await?;
            info!("Connected to PostgreSQL metadata store");
            Ok(Arc::new(repository))
        }
        "memory" => {
            info!("Using in-memory metadata store");
            Ok(Arc::new(MemoryRepository::new(payloads)))
        }
        other => Err(SetupError::UnsupportedDatabase(other.to_owned())),
    }
}
