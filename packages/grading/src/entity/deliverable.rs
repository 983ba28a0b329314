use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deliverable")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub assignment_id: Uuid,

    pub student_name: String,

    /// NULL until graded.
    pub mark: Option<f64>,
    pub certainty_threshold: Option<f64>,

    pub filename: String,
    pub extension: String,
    pub content_type: String,

    pub blob_handle: Option<String>,
    pub inline_content: Option<Vec<u8>>,
    pub size: i64,

    /// Text pulled from the document during name extraction, kept for audit.
    #[sea_orm(column_type = "Text", nullable)]
    pub extracted_text: Option<String>,

    pub uploaded_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
