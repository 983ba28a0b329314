use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ContentRef, MalformedRecord, RecordId};
use crate::entity::file;

/// Which of the assignment's artifact lists a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Rubric,
    RelevantDocument,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rubric => "rubric",
            Self::RelevantDocument => "relevant_document",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = MalformedRecord;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rubric" => Ok(Self::Rubric),
            "relevant_document" => Ok(Self::RelevantDocument),
            other => Err(MalformedRecord(format!("unknown file_type {other:?}"))),
        }
    }
}

/// A rubric or reference document attached to an assignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct File {
    pub id: RecordId,
    pub assignment_id: RecordId,
    pub filename: String,
    pub content_type: String,
    pub file_type: FileType,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
    /// Payload bytes. Populated by single-record reads, `None` in listings.
    #[serde(skip)]
    pub content: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct NewFile {
    pub assignment_id: RecordId,
    pub filename: String,
    pub content: Vec<u8>,
    pub content_type: String,
    pub file_type: FileType,
}

impl File {
    /// Decode a persisted row into the record and the location of its payload.
    pub(crate) fn from_model(model: file::Model) -> Result<(Self, ContentRef), MalformedRecord> {
        let content = ContentRef::from_columns(
            model.blob_handle.as_deref(),
            model.inline_content.as_deref(),
        )?;
        let size = u64::try_from(model.size)
            .map_err(|_| MalformedRecord(format!("file {} has size {}", model.id, model.size)))?;

        let record = Self {
            id: RecordId::from_uuid(model.id),
            assignment_id: RecordId::from_uuid(model.assignment_id),
            filename: model.filename,
            content_type: model.content_type,
            file_type: model.file_type.parse()?,
            size,
            uploaded_at: model.uploaded_at,
            content: None,
        };
        Ok((record, content))
    }
}
