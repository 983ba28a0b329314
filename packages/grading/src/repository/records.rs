//! Conversions shared by both repository backends.

use chrono::{DateTime, Utc};
use common::storage::BlobError;
use serde_json::json;
use tracing::{debug, warn};

use super::PayloadStore;
use crate::entity::{assignment, deliverable, file};
use crate::error::StorageError;
use crate::models::numeric::{MARK_MAX, MARK_MIN, clamp_round};
use crate::models::{
    Assignment, AssignmentUpdate, ContentRef, Deliverable, DeliverableUpdate, File, NewDeliverable,
    NewFile, RecordId,
};

/// Parse an incoming id, treating a malformed one as absent.
pub(super) fn parse_id(kind: &str, id: &str) -> Option<RecordId> {
    match RecordId::parse(id) {
        Ok(id) => Some(id),
        Err(e) => {
            debug!(kind, id, error = %e, "Malformed id treated as absent");
            None
        }
    }
}

pub(super) fn normalize_threshold(value: f64) -> f64 {
    clamp_round(value, 0.0, 1.0)
}

pub(super) fn normalize_mark(value: f64) -> f64 {
    clamp_round(value, MARK_MIN, MARK_MAX)
}

pub(super) fn new_assignment_model(
    id: RecordId,
    name: &str,
    confidence_threshold: f64,
    now: DateTime<Utc>,
) -> assignment::Model {
    assignment::Model {
        id: id.as_uuid(),
        name: name.to_owned(),
        confidence_threshold: normalize_threshold(confidence_threshold),
        rubric_ids: json!([]),
        relevant_document_ids: json!([]),
        deliverable_ids: json!([]),
        created_at: now,
        updated_at: now,
    }
}

pub(super) fn new_file_model(
    id: RecordId,
    file: NewFile,
    content: ContentRef,
    now: DateTime<Utc>,
) -> file::Model {
    let size = file.content.len() as i64;
    let (blob_handle, inline_content) = content.into_columns();
    file::Model {
        id: id.as_uuid(),
        assignment_id: file.assignment_id.as_uuid(),
        filename: file.filename,
        content_type: file.content_type,
        file_type: file.file_type.as_str().to_owned(),
        blob_handle,
        inline_content,
        size,
        uploaded_at: now,
    }
}

pub(super) fn new_deliverable_model(
    id: RecordId,
    deliverable: NewDeliverable,
    content: ContentRef,
    now: DateTime<Utc>,
) -> deliverable::Model {
    let size = deliverable.content.len() as i64;
    let (blob_handle, inline_content) = content.into_columns();
    deliverable::Model {
        id: id.as_uuid(),
        assignment_id: deliverable.assignment_id.as_uuid(),
        student_name: deliverable.student_name,
        mark: None,
        certainty_threshold: None,
        filename: deliverable.filename,
        extension: deliverable.extension,
        content_type: deliverable.content_type,
        blob_handle,
        inline_content,
        size,
        extracted_text: deliverable.extracted_text,
        uploaded_at: now,
        updated_at: now,
    }
}

pub(super) fn apply_assignment_update(
    model: &mut assignment::Model,
    update: &AssignmentUpdate,
    now: DateTime<Utc>,
) {
    if let Some(name) = &update.name {
        model.name = name.clone();
    }
    if let Some(threshold) = update.confidence_threshold {
        model.confidence_threshold = normalize_threshold(threshold);
    }
    model.updated_at = now;
}

pub(super) fn apply_deliverable_update(
    model: &mut deliverable::Model,
    update: &DeliverableUpdate,
    now: DateTime<Utc>,
) {
    if let Some(name) = &update.student_name {
        model.student_name = name.clone();
    }
    if let Some(mark) = update.mark {
        model.mark = Some(normalize_mark(mark));
    }
    if let Some(certainty) = update.certainty_threshold {
        model.certainty_threshold = Some(normalize_threshold(certainty));
    }
    model.updated_at = now;
}

pub(super) fn decode_assignment(model: assignment::Model) -> Option<Assignment> {
    let id = model.id;
    match Assignment::try_from(model) {
        Ok(assignment) => Some(assignment),
        Err(e) => {
            warn!(%id, error = %e, "Skipping malformed assignment");
            None
        }
    }
}

pub(super) fn decode_file(model: file::Model) -> Option<(File, ContentRef)> {
    let id = model.id;
    match File::from_model(model) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(%id, error = %e, "Skipping malformed file");
            None
        }
    }
}

pub(super) fn decode_deliverable(model: deliverable::Model) -> Option<(Deliverable, ContentRef)> {
    let id = model.id;
    match Deliverable::from_model(model) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(%id, error = %e, "Skipping malformed deliverable");
            None
        }
    }
}

/// Fetch a record's payload. A blob that is gone makes the record absent.
pub(super) async fn load_payload(
    payloads: &PayloadStore,
    kind: &str,
    id: RecordId,
    content: &ContentRef,
) -> Result<Option<Vec<u8>>, StorageError> {
    match payloads.read(content).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(BlobError::NotFound(handle)) => {
            warn!(kind, %id, %handle, "Payload missing from blob store");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Remove payloads during a cascade. Failures are logged and skipped, leaving
/// an orphaned blob rather than dangling metadata.
pub(super) async fn discard_all(
    payloads: &PayloadStore,
    assignment_id: RecordId,
    contents: &[ContentRef],
) {
    for content in contents {
        if let Err(e) = payloads.discard(content).await {
            warn!(%assignment_id, error = %e, "Failed to delete payload during cascade");
        }
    }
}
