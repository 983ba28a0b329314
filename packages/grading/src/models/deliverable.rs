use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use super::numeric::{MARK_MAX, MARK_MIN, stored_in_range};
use super::{ContentRef, MalformedRecord, RecordId};
use crate::entity::deliverable;

/// Student name used whenever none could be determined.
pub const UNKNOWN_STUDENT: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MarkStatus {
    Marked,
    Unmarked,
}

/// A student submission and its grading metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Deliverable {
    pub id: RecordId,
    pub assignment_id: RecordId,
    pub student_name: String,
    pub mark: Option<f64>,
    pub certainty_threshold: Option<f64>,
    pub filename: String,
    pub extension: String,
    pub content_type: String,
    pub size: u64,
    pub extracted_text: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Payload bytes. Populated by single-record reads, `None` in listings.
    pub content: Option<Vec<u8>>,
}

impl Deliverable {
    pub fn mark_status(&self) -> MarkStatus {
        if self.mark.is_some() {
            MarkStatus::Marked
        } else {
            MarkStatus::Unmarked
        }
    }

    pub(crate) fn from_model(
        model: deliverable::Model,
    ) -> Result<(Self, ContentRef), MalformedRecord> {
        let content = ContentRef::from_columns(
            model.blob_handle.as_deref(),
            model.inline_content.as_deref(),
        )?;
        let size = u64::try_from(model.size).map_err(|_| {
            MalformedRecord(format!("deliverable {} has size {}", model.id, model.size))
        })?;
        if model
            .mark
            .is_some_and(|mark| !stored_in_range(mark, MARK_MIN, MARK_MAX))
        {
            return Err(MalformedRecord(format!(
                "deliverable {} has mark {:?}",
                model.id, model.mark
            )));
        }
        if model
            .certainty_threshold
            .is_some_and(|certainty| !stored_in_range(certainty, 0.0, 1.0))
        {
            return Err(MalformedRecord(format!(
                "deliverable {} has certainty_threshold {:?}",
                model.id, model.certainty_threshold
            )));
        }

        let record = Self {
            id: RecordId::from_uuid(model.id),
            assignment_id: RecordId::from_uuid(model.assignment_id),
            student_name: model.student_name,
            mark: model.mark,
            certainty_threshold: model.certainty_threshold,
            filename: model.filename,
            extension: model.extension,
            content_type: model.content_type,
            size,
            extracted_text: model.extracted_text,
            uploaded_at: model.uploaded_at,
            updated_at: model.updated_at,
            content: None,
        };
        Ok((record, content))
    }
}

impl Serialize for Deliverable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Deliverable", 13)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("assignment_id", &self.assignment_id)?;
        state.serialize_field("student_name", &self.student_name)?;
        state.serialize_field("mark", &self.mark)?;
        state.serialize_field("mark_status", &self.mark_status())?;
        state.serialize_field("certainty_threshold", &self.certainty_threshold)?;
        state.serialize_field("filename", &self.filename)?;
        state.serialize_field("extension", &self.extension)?;
        state.serialize_field("content_type", &self.content_type)?;
        state.serialize_field("size", &self.size)?;
        state.serialize_field("extracted_text", &self.extracted_text)?;
        state.serialize_field("uploaded_at", &self.uploaded_at)?;
        state.serialize_field("updated_at", &self.updated_at)?;
        state.end()
    }
}

/// Partial update of a deliverable. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeliverableUpdate {
    pub student_name: Option<String>,
    pub mark: Option<f64>,
    pub certainty_threshold: Option<f64>,
}

impl DeliverableUpdate {
    pub fn is_empty(&self) -> bool {
        self.student_name.is_none() && self.mark.is_none() && self.certainty_threshold.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NewDeliverable {
    pub assignment_id: RecordId,
    pub filename: String,
    pub content: Vec<u8>,
    pub extension: String,
    pub content_type: String,
    pub student_name: String,
    pub extracted_text: Option<String>,
}
