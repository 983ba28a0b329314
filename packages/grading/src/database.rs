use std::time::Duration;

use sea_orm::sea_query::{Index, PostgresQueryBuilder};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use tracing::{info, warn};

use crate::entity::{deliverable, file};

pub async fn init_db(db_url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    opt.max_connections(max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(60))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("grading::entity::*")
        .sync(&db)
        .await?;

    Ok(db)
}

/// Create the composite listing indexes.
///
/// Schema sync does not create composite non-unique indexes, so they are
/// added here on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let statements = [
        (
            "idx_file_assignment_uploaded",
            Index::create()
                .if_not_exists()
                .name("idx_file_assignment_uploaded")
                .table(file::Entity)
                .col(file::Column::AssignmentId)
                .col(file::Column::UploadedAt)
                .to_string(PostgresQueryBuilder),
        ),
        (
            "idx_deliverable_assignment_uploaded",
            Index::create()
                .if_not_exists()
                .name("idx_deliverable_assignment_uploaded")
                .table(deliverable::Entity)
                .col(deliverable::Column::AssignmentId)
                .col(deliverable::Column::UploadedAt)
                .to_string(PostgresQueryBuilder),
        ),
    ];

    for (name, stmt) in statements {
        match db.execute_unprepared(&stmt).await {
            Ok(_) => info!("Ensured index {} exists", name),
            Err(e) => warn!("Failed to create index {}: {}", name, e),
        }
    }

    Ok(())
}
