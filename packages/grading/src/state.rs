use std::sync::Arc;

use common::storage::open_blob_store;

use crate::config::AppConfig;
use crate::error::SetupError;
use crate::extraction::{NameExtractor, UnknownNameExtractor};
use crate::repository::{PayloadStore, Repository, build_repository};
use crate::services::{AssignmentService, DeliverableService, HealthService};

/// Everything a caller needs, built once from configuration.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub repository: Arc<dyn Repository>,
    pub assignments: Arc<AssignmentService>,
    pub deliverables: Arc<DeliverableService>,
    pub health: Arc<HealthService>,
}

impl AppState {
    /// Open the configured stores with the default name extractor.
    pub async fn from_config(config: AppConfig) -> Result<Self, SetupError> {
        Self::with_extractor(config, Arc::new(UnknownNameExtractor)).await
    }

    pub async fn with_extractor(
        config: AppConfig,
        extractor: Arc<dyn NameExtractor>,
    ) -> Result<Self, SetupError> {
        let blobs = open_blob_store(&config.storage).await?;
        let payloads = PayloadStore::new(blobs, config.storage.inline_max_bytes);
        let repository = build_repository(&config.database, payloads).await?;
        Ok(Self::new(config, repository, extractor))
    }

    /// Wire services around an already built repository.
    pub fn new(
        config: AppConfig,
        repository: Arc<dyn Repository>,
        extractor: Arc<dyn NameExtractor>,
    ) -> Self {
        let assignments = Arc::new(AssignmentService::new(repository.clone()));
        let deliverables = Arc::new(DeliverableService::new(
            repository.clone(),
            extractor,
            config.extraction.timeout(),
        ));
        let health = Arc::new(HealthService::new(repository.clone()));
        Self {
            config,
            repository,
            assignments,
            deliverables,
            health,
        }
    }
}
