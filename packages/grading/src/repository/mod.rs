//! Persistence of assignments, files and deliverables.
//!
//! Metadata lives in a document store ([`PostgresRepository`] or
//! [`MemoryRepository`]); payloads go through a [`PayloadStore`]. The
//! assignment's id arrays are the source of truth for which children exist
//! and are only changed with single-statement append/remove operations.

mod content;
mod factory;
pub mod memory;
pub mod postgres;
mod records;

use async_trait::async_trait;

pub use content::PayloadStore;
pub use factory::build_repository;
pub use memory::{Collection, MemoryRepository};
pub use postgres::PostgresRepository;

use crate::error::StorageError;
use crate::models::{
    Assignment, AssignmentUpdate, Deliverable, DeliverableUpdate, File, FileType, NewDeliverable,
    NewFile, RecordId,
};

/// Storage contract consumed by the services.
///
/// Ids arrive as strings: a malformed id behaves exactly like a missing one.
/// Getters return `None` for a missing, malformed, or undecodable record;
/// listings skip undecodable records. Backend failures are returned as
/// [`StorageError`], except from [`Repository::health`].
#[async_trait]
pub trait Repository: Send + Sync {
    /// Whether the metadata store is reachable. Never fails.
    async fn health(&self) -> bool;

    /// `confidence_threshold` is clamped to [0, 1] and rounded to 2 decimals.
    async fn create_assignment(
        &self,
        name: &str,
        confidence_threshold: f64,
    ) -> Result<RecordId, StorageError>;

    async fn get_assignment(&self, id: &str) -> Result<Option<Assignment>, StorageError>;

    /// All assignments in creation order.
    async fn list_assignments(&self) -> Result<Vec<Assignment>, StorageError>;

    /// Returns `false` for an empty update or a missing assignment.
    async fn update_assignment(
        &self,
        id: &str,
        update: &AssignmentUpdate,
    ) -> Result<bool, StorageError>;

    /// Delete the assignment together with every file and deliverable that
    /// references it, payloads included. `true` only if the assignment
    /// record itself was removed.
    async fn delete_assignment(&self, id: &str) -> Result<bool, StorageError>;

    /// Store the payload, insert the record, then append its id to the
    /// assignment. If the assignment vanished the append is a no-op and the
    /// id is still returned.
    async fn store_file(&self, file: NewFile) -> Result<RecordId, StorageError>;

    /// The file with its payload loaded.
    async fn get_file(&self, id: &str) -> Result<Option<File>, StorageError>;

    /// Files of an assignment in upload order, without payloads.
    async fn list_files_by_assignment(
        &self,
        assignment_id: &str,
        file_type: Option<FileType>,
    ) -> Result<Vec<File>, StorageError>;

    async fn store_deliverable(
        &self,
        deliverable: NewDeliverable,
    ) -> Result<RecordId, StorageError>;

    /// The deliverable with its payload loaded.
    async fn get_deliverable(&self, id: &str) -> Result<Option<Deliverable>, StorageError>;

    /// Deliverables of an assignment in upload order, without payloads.
    async fn list_deliverables_by_assignment(
        &self,
        assignment_id: &str,
    ) -> Result<Vec<Deliverable>, StorageError>;

    /// Write only the supplied fields. Numbers are clamped and rounded.
    /// Returns `false` for an empty update or a missing deliverable.
    async fn update_deliverable(
        &self,
        id: &str,
        update: &DeliverableUpdate,
    ) -> Result<bool, StorageError>;

    /// Remove the payload, pull the id from the assignment, then delete the
    /// record. Returns `false` when the record was missing, and also when
    /// the owning assignment no longer listed it even though the record and
    /// payload were removed.
    async fn delete_deliverable(&self, id: &str) -> Result<bool, StorageError>;
}

/// The three id arrays kept on an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChildList {
    Rubrics,
    RelevantDocuments,
    Deliverables,
}

impl ChildList {
    /// Column name in SQL, field name in documents.
    pub(crate) fn column(&self) -> &'static str {
        match self {
            Self::Rubrics => "rubric_ids",
            Self::RelevantDocuments => "relevant_document_ids",
            Self::Deliverables => "deliverable_ids",
        }
    }

    pub(crate) fn for_file(file_type: FileType) -> Self {
        match file_type {
            FileType::Rubric => Self::Rubrics,
            FileType::RelevantDocument => Self::RelevantDocuments,
        }
    }
}
