use std::sync::Arc;

use crate::repository::Repository;

pub struct HealthService {
    repository: Arc<dyn Repository>,
}

impl HealthService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    pub async fn check_health(&self) -> bool {
        self.repository.health().await
    }
}
