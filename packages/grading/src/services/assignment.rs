use std::sync::Arc;

use tracing::info;

use super::{require_assignment, resolve_content_type};
use crate::error::ServiceError;
use crate::models::numeric::{validate_name, validate_threshold};
use crate::models::{Assignment, AssignmentUpdate, File, FileType, NewFile, RecordId};
use crate::repository::Repository;

const NAME_FIELD: &str = "Assignment name";
const THRESHOLD_FIELD: &str = "Confidence threshold";

pub struct AssignmentService {
    repository: Arc<dyn Repository>,
}

impl AssignmentService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    pub async fn create_assignment(
        &self,
        name: &str,
        confidence_threshold: f64,
    ) -> Result<RecordId, ServiceError> {
        validate_name(NAME_FIELD, name)?;
        let threshold = validate_threshold(THRESHOLD_FIELD, confidence_threshold)?;

        let id = self.repository.create_assignment(name, threshold).await?;
        info!(%id, name, "Created assignment");
        Ok(id)
    }

    pub async fn get_assignment(&self, id: &str) -> Result<Option<Assignment>, ServiceError> {
        Ok(self.repository.get_assignment(id).await?)
    }

    pub async fn list_assignments(&self) -> Result<Vec<Assignment>, ServiceError> {
        Ok(self.repository.list_assignments().await?)
    }

    /// Returns `false` when nothing was supplied or the assignment is missing.
    pub async fn update_assignment(
        &self,
        id: &str,
        update: AssignmentUpdate,
    ) -> Result<bool, ServiceError> {
        if let Some(name) = &update.name {
            validate_name(NAME_FIELD, name)?;
        }
        let confidence_threshold = update
            .confidence_threshold
            .map(|t| validate_threshold(THRESHOLD_FIELD, t))
            .transpose()?;
        if update.is_empty() {
            return Ok(false);
        }

        let update = AssignmentUpdate {
            name: update.name,
            confidence_threshold,
        };
        Ok(self.repository.update_assignment(id, &update).await?)
    }

    pub async fn delete_assignment(&self, id: &str) -> Result<bool, ServiceError> {
        let deleted = self.repository.delete_assignment(id).await?;
        if deleted {
            info!(id, "Deleted assignment with its files and deliverables");
        }
        Ok(deleted)
    }

    pub async fn upload_rubric(
        &self,
        assignment_id: &str,
        filename: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<RecordId, ServiceError> {
        self.upload(assignment_id, filename, content, content_type, FileType::Rubric)
            .await
    }

    pub async fn upload_relevant_document(
        &self,
        assignment_id: &str,
        filename: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<RecordId, ServiceError> {
        self.upload(
            assignment_id,
            filename,
            content,
            content_type,
            FileType::RelevantDocument,
        )
        .await
    }

    async fn upload(
        &self,
        assignment_id: &str,
        filename: &str,
        content: Vec<u8>,
        content_type: &str,
        file_type: FileType,
    ) -> Result<RecordId, ServiceError> {
        let assignment = require_assignment(self.repository.as_ref(), assignment_id).await?;

        let file = NewFile {
            assignment_id: assignment.id,
            filename: filename.to_owned(),
            content_type: resolve_content_type(filename, content_type),
            content,
            file_type,
        };
        let id = self.repository.store_file(file).await?;
        info!(%id, assignment_id, filename, %file_type, "Uploaded file");
        Ok(id)
    }

    pub async fn get_file(&self, id: &str) -> Result<Option<File>, ServiceError> {
        Ok(self.repository.get_file(id).await?)
    }

    /// The file with its payload, or `NotFound`.
    pub async fn download_file(&self, id: &str) -> Result<File, ServiceError> {
        self.repository
            .get_file(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("File".into()))
    }

    pub async fn list_rubrics(&self, assignment_id: &str) -> Result<Vec<File>, ServiceError> {
        Ok(self
            .repository
            .list_files_by_assignment(assignment_id, Some(FileType::Rubric))
            .await?)
    }

    pub async fn list_relevant_documents(
        &self,
        assignment_id: &str,
    ) -> Result<Vec<File>, ServiceError> {
        Ok(self
            .repository
            .list_files_by_assignment(assignment_id, Some(FileType::RelevantDocument))
            .await?)
    }
}
