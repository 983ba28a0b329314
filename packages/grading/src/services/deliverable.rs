use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use super::{require_assignment, resolve_content_type};
use crate::error::{ServiceError, ValidationError};
use crate::extraction::{NameExtraction, NameExtractor, extract_bounded, is_extractable};
use crate::models::numeric::{validate_mark, validate_name, validate_threshold};
use crate::models::{Deliverable, DeliverableUpdate, NewDeliverable, RecordId};
use crate::repository::Repository;

const SUPPORTED_EXTENSIONS: [&str; 1] = [".pdf"];
const SUPPORTED_MIME_TYPES: [&str; 1] = ["application/pdf"];

/// One submitted file.
#[derive(Debug, Clone)]
pub struct DeliverableUpload {
    pub filename: String,
    pub content: Vec<u8>,
    /// Without the leading dot. Derived from `filename` when empty.
    pub extension: String,
    /// Guessed from `filename` when empty.
    pub content_type: String,
}

impl DeliverableUpload {
    pub fn new(
        filename: impl Into<String>,
        content: Vec<u8>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content,
            extension: String::new(),
            content_type: content_type.into(),
        }
    }

    fn resolved_extension(&self) -> String {
        if !self.extension.trim().is_empty() {
            return self.extension.trim().trim_start_matches('.').to_lowercase();
        }
        Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_lowercase()
    }
}

pub struct DeliverableService {
    repository: Arc<dyn Repository>,
    extractor: Arc<dyn NameExtractor>,
    extraction_timeout: Duration,
}

impl DeliverableService {
    pub fn new(
        repository: Arc<dyn Repository>,
        extractor: Arc<dyn NameExtractor>,
        extraction_timeout: Duration,
    ) -> Self {
        Self {
            repository,
            extractor,
            extraction_timeout,
        }
    }

    /// Store a submission for an existing assignment.
    ///
    /// With `extract_name` set and a PDF payload, the student name is guessed
    /// from the document; otherwise, or when extraction finds nothing, it is
    /// `"Unknown"`.
    pub async fn upload_deliverable(
        &self,
        assignment_id: &str,
        upload: DeliverableUpload,
        extract_name: bool,
    ) -> Result<RecordId, ServiceError> {
        let assignment = require_assignment(self.repository.as_ref(), assignment_id).await?;

        let extension = upload.resolved_extension();
        let extraction = if extract_name && is_extractable(&extension) {
            extract_bounded(
                self.extractor.as_ref(),
                &upload.content,
                self.extraction_timeout,
            )
            .await
        } else {
            NameExtraction::unknown()
        };

        let deliverable = NewDeliverable {
            assignment_id: assignment.id,
            content_type: resolve_content_type(&upload.filename, &upload.content_type),
            filename: upload.filename,
            content: upload.content,
            extension,
            student_name: extraction.student_name,
            extracted_text: extraction.extracted_text,
        };
        let id = self.repository.store_deliverable(deliverable).await?;
        info!(%id, assignment_id, "Uploaded deliverable");
        Ok(id)
    }

    /// Upload each file independently. Failed items are logged and left out
    /// of the returned ids; only a missing assignment fails the whole batch.
    pub async fn upload_multiple_deliverables(
        &self,
        assignment_id: &str,
        uploads: Vec<DeliverableUpload>,
        extract_names: bool,
    ) -> Result<Vec<RecordId>, ServiceError> {
        require_assignment(self.repository.as_ref(), assignment_id).await?;

        let total = uploads.len();
        let mut ids = Vec::with_capacity(total);
        for upload in uploads {
            let filename = upload.filename.clone();
            match self
                .upload_deliverable(assignment_id, upload, extract_names)
                .await
            {
                Ok(id) => ids.push(id),
                Err(e) => error!(%filename, error = %e, "Failed to upload deliverable"),
            }
        }

        info!(
            assignment_id,
            uploaded = ids.len(),
            failed = total - ids.len(),
            "Batch upload finished"
        );
        Ok(ids)
    }

    /// Validate the supplied fields, then write only those.
    ///
    /// `Ok(false)` covers both an empty update and a missing deliverable.
    pub async fn update_deliverable(
        &self,
        id: &str,
        update: DeliverableUpdate,
    ) -> Result<bool, ServiceError> {
        if let Some(name) = &update.student_name {
            validate_name("Student name", name.trim())?;
        }
        let mark = update.mark.map(validate_mark).transpose()?;
        let certainty_threshold = update
            .certainty_threshold
            .map(|c| validate_threshold("Certainty threshold", c))
            .transpose()?;
        if update.is_empty() {
            return Ok(false);
        }

        let update = DeliverableUpdate {
            student_name: update.student_name.map(|name| name.trim().to_owned()),
            mark,
            certainty_threshold,
        };
        Ok(self.repository.update_deliverable(id, &update).await?)
    }

    pub async fn get_deliverable(&self, id: &str) -> Result<Option<Deliverable>, ServiceError> {
        Ok(self.repository.get_deliverable(id).await?)
    }

    /// The deliverable with its payload, or `NotFound`.
    pub async fn download_deliverable(&self, id: &str) -> Result<Deliverable, ServiceError> {
        self.repository
            .get_deliverable(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Deliverable".into()))
    }

    pub async fn list_deliverables(
        &self,
        assignment_id: &str,
    ) -> Result<Vec<Deliverable>, ServiceError> {
        Ok(self
            .repository
            .list_deliverables_by_assignment(assignment_id)
            .await?)
    }

    pub async fn delete_deliverable(&self, id: &str) -> Result<bool, ServiceError> {
        Ok(self.repository.delete_deliverable(id).await?)
    }

    /// Only PDF submissions are accepted.
    pub fn validate_file_format(filename: &str, content_type: &str) -> Result<(), ValidationError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_lowercase()))
            .unwrap_or_default();

        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ValidationError(format!(
                "File format not supported. Supported formats: {}",
                SUPPORTED_EXTENSIONS.join(", ")
            )));
        }
        if !SUPPORTED_MIME_TYPES.contains(&content_type) {
            return Err(ValidationError(format!(
                "Content type not supported. Supported types: {}",
                SUPPORTED_MIME_TYPES.join(", ")
            )));
        }
        Ok(())
    }
}
