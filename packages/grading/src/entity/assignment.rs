use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "assignment")]
pub struct Model {
    /// UUIDv7 primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub name: String,

    /// Stored clamped to [0, 1] and rounded to 2 decimals.
    pub confidence_threshold: f64,

    /// JSON array of rubric file ids, in upload order.
    #[sea_orm(column_type = "JsonBinary")]
    pub rubric_ids: serde_json::Value,

    #[sea_orm(column_type = "JsonBinary")]
    pub relevant_document_ids: serde_json::Value,

    #[sea_orm(column_type = "JsonBinary")]
    pub deliverable_ids: serde_json::Value,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
