//! Subject repository.

use std::sync::Arc;

use crate::entities::{
    Subject,
    subject::{self, SubjectKind},
};
use civica_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

/// Subject repository for database operations.
#[derive(Clone)]
pub struct SubjectRepository {
    db: Arc<DatabaseConnection>,
}

impl SubjectRepository {
    /// Create a new subject repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a subject by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<subject::Model>> {
        Subject::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a subject by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<subject::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Subject not found: {id}")))
    }

    /// List subjects, newest first, optionally filtered by kind.
    pub async fn list(
        &self,
        kind: Option<SubjectKind>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<subject::Model>> {
        let mut query = Subject::find().order_by_desc(subject::Column::Id);

        if let Some(kind) = kind {
            query = query.filter(subject::Column::Kind.eq(kind));
        }

        query
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new subject.
    pub async fn create(&self, model: subject::ActiveModel) -> AppResult<subject::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
