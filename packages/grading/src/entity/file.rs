use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "file")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Back-reference for filtering only; existence is decided by the
    /// assignment's id arrays.
    pub assignment_id: Uuid,

    pub filename: String,
    pub content_type: String,

    /// `rubric` or `relevant_document`. Immutable after insert.
    pub file_type: String,

    /// Set when the payload lives in the blob store.
    pub blob_handle: Option<String>,
    /// Set when the payload is small enough to live on the row.
    pub inline_content: Option<Vec<u8>>,

    /// Payload length in bytes.
    pub size: i64,

    pub uploaded_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
