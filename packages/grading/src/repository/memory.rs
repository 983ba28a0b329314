//! Process-local document store.
//!
//! Each collection is a list of JSON documents in insertion order, encoded
//! from the same entity models the PostgreSQL backend uses. A single lock
//! guards all collections, so every id-array append or remove is atomic.

use async_trait::async_trait;
use chrono::Utc;
use common::storage::BlobMetadata;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{instrument, warn};
use uuid::Uuid;

use super::records::{
    apply_assignment_update, apply_deliverable_update, decode_assignment, decode_deliverable,
    decode_file, discard_all, load_payload, new_assignment_model, new_deliverable_model,
    new_file_model, parse_id,
};
use super::{ChildList, PayloadStore, Repository};
use crate::entity::{assignment, deliverable, file};
use crate::error::StorageError;
use crate::models::{
    Assignment, AssignmentUpdate, ContentRef, Deliverable, DeliverableUpdate, File, FileType,
    NewDeliverable, NewFile, RecordId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Assignments,
    Files,
    Deliverables,
}

#[derive(Default)]
struct Documents {
    assignments: Vec<Value>,
    files: Vec<Value>,
    deliverables: Vec<Value>,
}

impl Documents {
    fn get(&self, collection: Collection) -> &Vec<Value> {
        match collection {
            Collection::Assignments => &self.assignments,
            Collection::Files => &self.files,
            Collection::Deliverables => &self.deliverables,
        }
    }

    fn get_mut(&mut self, collection: Collection) -> &mut Vec<Value> {
        match collection {
            Collection::Assignments => &mut self.assignments,
            Collection::Files => &mut self.files,
            Collection::Deliverables => &mut self.deliverables,
        }
    }
}

fn field_is(doc: &Value, field: &str, id: Uuid) -> bool {
    doc.get(field)
        .and_then(Value::as_str)
        .and_then(|s| Uuid::try_parse(s).ok())
        == Some(id)
}

fn decode<M: DeserializeOwned>(collection: Collection, doc: &Value) -> Option<M> {
    match serde_json::from_value(doc.clone()) {
        Ok(model) => Some(model),
        Err(e) => {
            warn!(?collection, error = %e, "Skipping undecodable document");
            None
        }
    }
}

fn touch(doc: &mut Value) {
    if let (Some(fields), Ok(now)) = (doc.as_object_mut(), serde_json::to_value(Utc::now())) {
        fields.insert("updated_at".into(), now);
    }
}

pub struct MemoryRepository {
    documents: RwLock<Documents>,
    payloads: PayloadStore,
}

impl MemoryRepository {
    pub fn new(payloads: PayloadStore) -> Self {
        Self {
            documents: RwLock::new(Documents::default()),
            payloads,
        }
    }

    pub fn payloads(&self) -> &PayloadStore {
        &self.payloads
    }

    /// Append a document as-is, bypassing all encoding. Lets tests plant
    /// corrupted records.
    pub async fn insert_raw_document(&self, collection: Collection, document: Value) {
        self.documents
            .write()
            .await
            .get_mut(collection)
            .push(document);
    }

    async fn insert<M: Serialize>(
        &self,
        collection: Collection,
        model: &M,
    ) -> Result<(), StorageError> {
        let document = serde_json::to_value(model)?;
        self.documents
            .write()
            .await
            .get_mut(collection)
            .push(document);
        Ok(())
    }

    async fn find(&self, collection: Collection, id: Uuid) -> Option<Value> {
        self.documents
            .read()
            .await
            .get(collection)
            .iter()
            .find(|doc| field_is(doc, "id", id))
            .cloned()
    }

    async fn children(&self, collection: Collection, assignment_id: Uuid) -> Vec<Value> {
        self.documents
            .read()
            .await
            .get(collection)
            .iter()
            .filter(|doc| field_is(doc, "assignment_id", assignment_id))
            .cloned()
            .collect()
    }

    /// Returns whether the assignment was found.
    async fn push_child(&self, assignment_id: RecordId, list: ChildList, child: RecordId) -> bool {
        let mut documents = self.documents.write().await;
        let Some(doc) = documents
            .assignments
            .iter_mut()
            .find(|doc| field_is(doc, "id", assignment_id.as_uuid()))
        else {
            return false;
        };
        let Some(ids) = doc.get_mut(list.column()).and_then(Value::as_array_mut) else {
            warn!(%assignment_id, list = list.column(), "Id list is not an array");
            return false;
        };
        ids.push(Value::String(child.to_hex()));
        touch(doc);
        true
    }

    /// Returns whether the assignment was found.
    async fn pull_child(&self, assignment_id: RecordId, list: ChildList, child: RecordId) -> bool {
        let child = child.to_hex();
        let mut documents = self.documents.write().await;
        let Some(doc) = documents
            .assignments
            .iter_mut()
            .find(|doc| field_is(doc, "id", assignment_id.as_uuid()))
        else {
            return false;
        };
        let Some(ids) = doc.get_mut(list.column()).and_then(Value::as_array_mut) else {
            warn!(%assignment_id, list = list.column(), "Id list is not an array");
            return false;
        };
        ids.retain(|id| id.as_str() != Some(child.as_str()));
        touch(doc);
        true
    }

    async fn remove(&self, collection: Collection, id: Uuid) -> bool {
        let mut documents = self.documents.write().await;
        let docs = documents.get_mut(collection);
        let before = docs.len();
        docs.retain(|doc| !field_is(doc, "id", id));
        docs.len() < before
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn health(&self) -> bool {
        true
    }

    #[instrument(skip(self))]
    async fn create_assignment(
        &self,
        name: &str,
        confidence_threshold: f64,
    ) -> Result<RecordId, StorageError> {
        let id = RecordId::generate();
        let model = new_assignment_model(id, name, confidence_threshold, Utc::now());
        self.insert(Collection::Assignments, &model).await?;
        Ok(id)
    }

    async fn get_assignment(&self, id: &str) -> Result<Option<Assignment>, StorageError> {
        let Some(id) = parse_id("assignment", id) else {
            return Ok(None);
        };
        Ok(self
            .find(Collection::Assignments, id.as_uuid())
            .await
            .and_then(|doc| decode::<assignment::Model>(Collection::Assignments, &doc))
            .and_then(decode_assignment))
    }

    async fn list_assignments(&self) -> Result<Vec<Assignment>, StorageError> {
        let docs = self.documents.read().await.assignments.clone();
        let mut assignments: Vec<Assignment> = docs
            .iter()
            .filter_map(|doc| decode::<assignment::Model>(Collection::Assignments, doc))
            .filter_map(decode_assignment)
            .collect();
        assignments.sort_by_key(|a| (a.created_at, a.id));
        Ok(assignments)
    }

    #[instrument(skip(self))]
    async fn update_assignment(
        &self,
        id: &str,
        update: &AssignmentUpdate,
    ) -> Result<bool, StorageError> {
        if update.is_empty() {
            return Ok(false);
        }
        let Some(id) = parse_id("assignment", id) else {
            return Ok(false);
        };

        let mut documents = self.documents.write().await;
        let Some(doc) = documents
            .assignments
            .iter_mut()
            .find(|doc| field_is(doc, "id", id.as_uuid()))
        else {
            return Ok(false);
        };
        let Some(mut model) = decode::<assignment::Model>(Collection::Assignments, doc) else {
            return Ok(false);
        };
        apply_assignment_update(&mut model, update, Utc::now());
        *doc = serde_json::to_value(&model)?;
        Ok(true)
    }

    #[instrument(skip(self))]
    async fn delete_assignment(&self, id: &str) -> Result<bool, StorageError> {
        let Some(id) = parse_id("assignment", id) else {
            return Ok(false);
        };
        let uuid = id.as_uuid();

        let mut contents = Vec::new();
        for doc in self.children(Collection::Files, uuid).await {
            if let Some(model) = decode::<file::Model>(Collection::Files, &doc) {
                contents.extend(
                    ContentRef::from_columns(
                        model.blob_handle.as_deref(),
                        model.inline_content.as_deref(),
                    )
                    .ok(),
                );
            }
        }
        for doc in self.children(Collection::Deliverables, uuid).await {
            if let Some(model) = decode::<deliverable::Model>(Collection::Deliverables, &doc) {
                contents.extend(
                    ContentRef::from_columns(
                        model.blob_handle.as_deref(),
                        model.inline_content.as_deref(),
                    )
                    .ok(),
                );
            }
        }
        discard_all(&self.payloads, id, &contents).await;

        let mut documents = self.documents.write().await;
        documents
            .files
            .retain(|doc| !field_is(doc, "assignment_id", uuid));
        documents
            .deliverables
            .retain(|doc| !field_is(doc, "assignment_id", uuid));
        let before = documents.assignments.len();
        documents.assignments.retain(|doc| !field_is(doc, "id", uuid));
        Ok(documents.assignments.len() < before)
    }

    #[instrument(skip(self, file), fields(assignment_id = %file.assignment_id, filename = %file.filename))]
    async fn store_file(&self, file: NewFile) -> Result<RecordId, StorageError> {
        let content = self
            .payloads
            .write(
                &file.content,
                BlobMetadata::new(&file.filename, &file.content_type),
            )
            .await?;
        let id = RecordId::generate();
        let assignment_id = file.assignment_id;
        let list = ChildList::for_file(file.file_type);

        let model = new_file_model(id, file, content, Utc::now());
        self.insert(Collection::Files, &model).await?;

        if !self.push_child(assignment_id, list, id).await {
            warn!(%id, "Assignment not found, file stored unlinked");
        }
        Ok(id)
    }

    async fn get_file(&self, id: &str) -> Result<Option<File>, StorageError> {
        let Some(id) = parse_id("file", id) else {
            return Ok(None);
        };
        let Some((mut file, content)) = self
            .find(Collection::Files, id.as_uuid())
            .await
            .and_then(|doc| decode::<file::Model>(Collection::Files, &doc))
            .and_then(decode_file)
        else {
            return Ok(None);
        };
        let Some(bytes) = load_payload(&self.payloads, "file", id, &content).await? else {
            return Ok(None);
        };
        file.content = Some(bytes);
        Ok(Some(file))
    }

    async fn list_files_by_assignment(
        &self,
        assignment_id: &str,
        file_type: Option<FileType>,
    ) -> Result<Vec<File>, StorageError> {
        let Some(assignment_id) = parse_id("assignment", assignment_id) else {
            return Ok(Vec::new());
        };
        let mut files: Vec<File> = self
            .children(Collection::Files, assignment_id.as_uuid())
            .await
            .iter()
            .filter_map(|doc| decode::<file::Model>(Collection::Files, doc))
            .filter_map(decode_file)
            .map(|(file, _)| file)
            .filter(|file| file_type.is_none_or(|t| file.file_type == t))
            .collect();
        files.sort_by_key(|f| (f.uploaded_at, f.id));
        Ok(files)
    }

    #[instrument(skip(self, deliverable), fields(assignment_id = %deliverable.assignment_id, filename = %deliverable.filename))]
    async fn store_deliverable(
        &self,
        deliverable: NewDeliverable,
    ) -> Result<RecordId, StorageError> {
        let content = self
            .payloads
            .write(
                &deliverable.content,
                BlobMetadata::new(&deliverable.filename, &deliverable.content_type),
            )
            .await?;
        let id = RecordId::generate();
        let assignment_id = deliverable.assignment_id;

        let model = new_deliverable_model(id, deliverable, content, Utc::now());
        self.insert(Collection::Deliverables, &model).await?;

        if !self
            .push_child(assignment_id, ChildList::Deliverables, id)
            .await
        {
            warn!(%id, "Assignment not found, deliverable stored unlinked");
        }
        Ok(id)
    }

    async fn get_deliverable(&self, id: &str) -> Result<Option<Deliverable>, StorageError> {
        let Some(id) = parse_id("deliverable", id) else {
            return Ok(None);
        };
        let Some((mut deliverable, content)) = self
            .find(Collection::Deliverables, id.as_uuid())
            .await
            .and_then(|doc| decode::<deliverable::Model>(Collection::Deliverables, &doc))
            .and_then(decode_deliverable)
        else {
            return Ok(None);
        };
        let Some(bytes) = load_payload(&self.payloads, "deliverable", id, &content).await? else {
            return Ok(None);
        };
        deliverable.content = Some(bytes);
        Ok(Some(deliverable))
    }

    async fn list_deliverables_by_assignment(
        &self,
        assignment_id: &str,
    ) -> Result<Vec<Deliverable>, StorageError> {
        let Some(assignment_id) = parse_id("assignment", assignment_id) else {
            return Ok(Vec::new());
        };
        let mut deliverables: Vec<Deliverable> = self
            .children(Collection::Deliverables, assignment_id.as_uuid())
            .await
            .iter()
            .filter_map(|doc| decode::<deliverable::Model>(Collection::Deliverables, doc))
            .filter_map(decode_deliverable)
            .map(|(deliverable, _)| deliverable)
            .collect();
        deliverables.sort_by_key(|d| (d.uploaded_at, d.id));
        Ok(deliverables)
    }

    #[instrument(skip(self))]
    async fn update_deliverable(
        &self,
        id: &str,
        update: &DeliverableUpdate,
    ) -> Result<bool, StorageError> {
        if update.is_empty() {
            return Ok(false);
        }
        let Some(id) = parse_id("deliverable", id) else {
            return Ok(false);
        };

        let mut documents = self.documents.write().await;
        let Some(doc) = documents
            .deliverables
            .iter_mut()
            .find(|doc| field_is(doc, "id", id.as_uuid()))
        else {
            return Ok(false);
        };
        let Some(mut model) = decode::<deliverable::Model>(Collection::Deliverables, doc) else {
            return Ok(false);
        };
        apply_deliverable_update(&mut model, update, Utc::now());
        *doc = serde_json::to_value(&model)?;
        Ok(true)
    }

    #[instrument(skip(self))]
    async fn delete_deliverable(&self, id: &str) -> Result<bool, StorageError> {
        let Some(id) = parse_id("deliverable", id) else {
            return Ok(false);
        };
        let Some(model) = self
            .find(Collection::Deliverables, id.as_uuid())
            .await
            .and_then(|doc| decode::<deliverable::Model>(Collection::Deliverables, &doc))
        else {
            return Ok(false);
        };

        match ContentRef::from_columns(model.blob_handle.as_deref(), model.inline_content.as_deref())
        {
            Ok(content) => self.payloads.discard(&content).await?,
            Err(e) => warn!(%id, error = %e, "Unreadable payload reference, blob left in place"),
        }

        let assignment_id = RecordId::from_uuid(model.assignment_id);
        let unlinked = self
            .pull_child(assignment_id, ChildList::Deliverables, id)
            .await;
        if !unlinked {
            warn!(%id, %assignment_id, "Owning assignment not found while unlinking deliverable");
        }

        let removed = self.remove(Collection::Deliverables, id.as_uuid()).await;
        Ok(unlinked && removed)
    }
}
