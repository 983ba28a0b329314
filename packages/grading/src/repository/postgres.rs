use async_trait::async_trait;
use chrono::Utc;
use common::storage::BlobMetadata;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr,
    EntityTrait, QueryFilter, QueryOrder, Statement, Value,
};
use tracing::{instrument, warn};

use super::records::{
    decode_assignment, decode_deliverable, decode_file, discard_all, load_payload,
    new_assignment_model, new_deliverable_model, new_file_model, normalize_mark,
    normalize_threshold, parse_id,
};
use super::{ChildList, PayloadStore, Repository};
use crate::config::DatabaseConfig;
use crate::database::{ensure_indexes, init_db};
use crate::entity::{assignment, deliverable, file};
use crate::error::StorageError;
use crate::models::{
    Assignment, AssignmentUpdate, ContentRef, Deliverable, DeliverableUpdate, File, FileType,
    NewDeliverable, NewFile, RecordId,
};

/// Repository backed by PostgreSQL through sea-orm.
///
/// Id arrays are `jsonb` columns changed by a single `UPDATE` each, so
/// concurrent uploads to one assignment never lose a sibling id.
pub struct PostgresRepository {
    db: DatabaseConnection,
    payloads: PayloadStore,
}

impl PostgresRepository {
    pub fn new(db: DatabaseConnection, payloads: PayloadStore) -> Self {
        Self { db, payloads }
    }

    /// Connect, sync the schema and ensure indexes.
    pub async fn connect(config: &DatabaseConfig, payloads: PayloadStore) -> Result<Self, DbErr> {
        let db = init_db(&config.url, config.max_connections).await?;
        ensure_indexes(&db).await?;
        Ok(Self::new(db, payloads))
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn payloads(&self) -> &PayloadStore {
        &self.payloads
    }

    /// Returns whether the assignment row was matched.
    async fn push_child(
        &self,
        assignment_id: RecordId,
        list: ChildList,
        child: RecordId,
    ) -> Result<bool, DbErr> {
        let column = list.column();
        let sql = format!(
            "UPDATE assignment SET {column} = {column} || jsonb_build_array($1::text), \
             updated_at = $2 WHERE id = $3"
        );
        let result = self
            .db
            .execute_raw(Statement::from_sql_and_values(
                DbBackend::Postgres,
                sql,
                [
                    Value::from(child.to_hex()),
                    Value::from(Utc::now()),
                    Value::from(assignment_id.as_uuid()),
                ],
            ))
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Returns whether the assignment row was matched.
    async fn pull_child(
        &self,
        assignment_id: RecordId,
        list: ChildList,
        child: RecordId,
    ) -> Result<bool, DbErr> {
        let column = list.column();
        let sql = format!(
            "UPDATE assignment SET {column} = {column} - $1::text, updated_at = $2 WHERE id = $3"
        );
        let result = self
            .db
            .execute_raw(Statement::from_sql_and_values(
                DbBackend::Postgres,
                sql,
                [
                    Value::from(child.to_hex()),
                    Value::from(Utc::now()),
                    Value::from(assignment_id.as_uuid()),
                ],
            ))
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Drop a freshly written payload whose metadata insert failed.
    async fn discard_unreferenced(&self, content: Option<ContentRef>) {
        let Some(content) = content else {
            return;
        };
        if let Err(e) = self.payloads.discard(&content).await {
            warn!(error = %e, "Failed to remove payload of a record that was never inserted");
        }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn health(&self) -> bool {
        match self.db.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Database ping failed");
                false
            }
        }
    }

    #[instrument(skip(self))]
    async fn create_assignment(
        &self,
        name: &str,
        confidence_threshold: f64,
    ) -> Result<RecordId, StorageError> {
        let id = RecordId::generate();
        let model = new_assignment_model(id, name, confidence_threshold, Utc::now());
        assignment::ActiveModel::from(model)
            .reset_all()
            .insert(&self.db)
            .await?;
        Ok(id)
    }

    async fn get_assignment(&self, id: &str) -> Result<Option<Assignment>, StorageError> {
        let Some(id) = parse_id("assignment", id) else {
            return Ok(None);
        };
        let model = assignment::Entity::find_by_id(id.as_uuid())
            .one(&self.db)
            .await?;
        Ok(model.and_then(decode_assignment))
    }

    async fn list_assignments(&self) -> Result<Vec<Assignment>, StorageError> {
        let models = assignment::Entity::find()
            .order_by_asc(assignment::Column::CreatedAt)
            .order_by_asc(assignment::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().filter_map(decode_assignment).collect())
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

        let mut query = assignment::Entity::update_many()
            .col_expr(assignment::Column::UpdatedAt, Expr::value(Utc::now()));
        if let Some(name) = &update.name {
            query = query.col_expr(assignment::Column::Name, Expr::value(name.clone()));
        }
        if let Some(threshold) = update.confidence_threshold {
            query = query.col_expr(
                assignment::Column::ConfidenceThreshold,
                Expr::value(normalize_threshold(threshold)),
            );
        }

        let result = query
            .filter(assignment::Column::Id.eq(id.as_uuid()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    #[instrument(skip(self))]
    async fn delete_assignment(&self, id: &str) -> Result<bool, StorageError> {
        let Some(id) = parse_id("assignment", id) else {
            return Ok(false);
        };
        let uuid = id.as_uuid();

        let files = file::Entity::find()
            .filter(file::Column::AssignmentId.eq(uuid))
            .all(&self.db)
            .await?;
        let deliverables = deliverable::Entity::find()
            .filter(deliverable::Column::AssignmentId.eq(uuid))
            .all(&self.db)
            .await?;

        let contents: Vec<ContentRef> = files
            .iter()
            .map(|f| ContentRef::from_columns(f.blob_handle.as_deref(), f.inline_content.as_deref()))
            .chain(deliverables.iter().map(|d| {
                ContentRef::from_columns(d.blob_handle.as_deref(), d.inline_content.as_deref())
            }))
            .filter_map(Result::ok)
            .collect();
        discard_all(&self.payloads, id, &contents).await;

        file::Entity::delete_many()
            .filter(file::Column::AssignmentId.eq(uuid))
            .exec(&self.db)
            .await?;
        deliverable::Entity::delete_many()
            .filter(deliverable::Column::AssignmentId.eq(uuid))
            .exec(&self.db)
            .await?;

        let result = assignment::Entity::delete_by_id(uuid).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
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
        let written = content.handle().copied().map(ContentRef::Handle);

        let model = new_file_model(id, file, content, Utc::now());
        if let Err(e) = file::ActiveModel::from(model)
            .reset_all()
            .insert(&self.db)
            .await
        {
            self.discard_unreferenced(written).await;
            return Err(e.into());
        }

        if !self.push_child(assignment_id, list, id).await? {
            warn!(%id, "Assignment not found, file stored unlinked");
        }
        Ok(id)
    }

    async fn get_file(&self, id: &str) -> Result<Option<File>, StorageError> {
        let Some(id) = parse_id("file", id) else {
            return Ok(None);
        };
        let Some((mut file, content)) = file::Entity::find_by_id(id.as_uuid())
            .one(&self.db)
            .await?
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
        let mut query =
            file::Entity::find().filter(file::Column::AssignmentId.eq(assignment_id.as_uuid()));
        if let Some(file_type) = file_type {
            query = query.filter(file::Column::FileType.eq(file_type.as_str()));
        }
        let models = query
            .order_by_asc(file::Column::UploadedAt)
            .order_by_asc(file::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models
            .into_iter()
            .filter_map(decode_file)
            .map(|(file, _)| file)
            .collect())
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
        let written = content.handle().copied().map(ContentRef::Handle);

        let model = new_deliverable_model(id, deliverable, content, Utc::now());
        if let Err(e) = deliverable::ActiveModel::from(model)
            .reset_all()
            .insert(&self.db)
            .await
        {
            self.discard_unreferenced(written).await;
            return Err(e.into());
        }

        if !self
            .push_child(assignment_id, ChildList::Deliverables, id)
            .await?
        {
            warn!(%id, "Assignment not found, deliverable stored unlinked");
        }
        Ok(id)
    }

    async fn get_deliverable(&self, id: &str) -> Result<Option<Deliverable>, StorageError> {
        let Some(id) = parse_id("deliverable", id) else {
            return Ok(None);
        };
        let Some((mut deliverable, content)) = deliverable::Entity::find_by_id(id.as_uuid())
            .one(&self.db)
            .await?
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
        let models = deliverable::Entity::find()
            .filter(deliverable::Column::AssignmentId.eq(assignment_id.as_uuid()))
            .order_by_asc(deliverable::Column::UploadedAt)
            .order_by_asc(deliverable::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models
            .into_iter()
            .filter_map(decode_deliverable)
            .map(|(deliverable, _)| deliverable)
            .collect())
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

        let mut query = deliverable::Entity::update_many()
            .col_expr(deliverable::Column::UpdatedAt, Expr::value(Utc::now()));
        if let Some(name) = &update.student_name {
            query = query.col_expr(deliverable::Column::StudentName, Expr::value(name.clone()));
        }
        if let Some(mark) = update.mark {
            query = query.col_expr(deliverable::Column::Mark, Expr::value(normalize_mark(mark)));
        }
        if let Some(certainty) = update.certainty_threshold {
            query = query.col_expr(
                deliverable::Column::CertaintyThreshold,
                Expr::value(normalize_threshold(certainty)),
            );
        }

        let result = query
            .filter(deliverable::Column::Id.eq(id.as_uuid()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    #[instrument(skip(self))]
    async fn delete_deliverable(&self, id: &str) -> Result<bool, StorageError> {
        let Some(id) = parse_id("deliverable", id) else {
            return Ok(false);
        };
        let Some(model) = deliverable::Entity::find_by_id(id.as_uuid())
            .one(&self.db)
            .await?
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
            .await?;
        if !unlinked {
            warn!(%id, %assignment_id, "Owning assignment not found while unlinking deliverable");
        }

        let result = deliverable::Entity::delete_by_id(id.as_uuid())
            .exec(&self.db)
            .await?;
        Ok(unlinked && result.rows_affected > 0)
    }
}
