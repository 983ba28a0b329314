use grading::config::AppConfig;
use grading::state::AppState;
use tracing::{Level, error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load()?;
    info!(
        database = %config.database.kind,
        storage = %config.storage.backend,
        "Starting grading store"
    );

    let state = AppState::from_config(config).await?;
    if state.health.check_health().await {
        info!("Metadata store is healthy");
        Ok(())
    } else {
        error!("Metadata store is unreachable");
        anyhow::bail!("health check failed")
    }
}
