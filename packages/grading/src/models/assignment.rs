use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::numeric::stored_in_range;
use super::{MalformedRecord, RecordId, parse_id_list};
use crate::entity::assignment;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub id: RecordId,
    pub name: String,
    pub confidence_threshold: f64,
    pub rubric_ids: Vec<RecordId>,
    pub relevant_document_ids: Vec<RecordId>,
    pub deliverable_ids: Vec<RecordId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields of an assignment that may be changed after creation.
///
/// `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AssignmentUpdate {
    pub name: Option<String>,
    pub confidence_threshold: Option<f64>,
}

impl AssignmentUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.confidence_threshold.is_none()
    }
}

impl TryFrom<assignment::Model> for Assignment {
    type Error = MalformedRecord;

    fn try_from(model: assignment::Model) -> Result<Self, Self::Error> {
        if !stored_in_range(model.confidence_threshold, 0.0, 1.0) {
            return Err(MalformedRecord(format!(
                "assignment {} has confidence_threshold {}",
                model.id, model.confidence_threshold
            )));
        }

        Ok(Self {
            id: RecordId::from_uuid(model.id),
            name: model.name,
            confidence_threshold: model.confidence_threshold,
            rubric_ids: parse_id_list(&model.rubric_ids)?,
            relevant_document_ids: parse_id_list(&model.relevant_document_ids)?,
            deliverable_ids: parse_id_list(&model.deliverable_ids)?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
