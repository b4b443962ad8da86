//! Subject service.

use chrono::NaiveDate;
use civica_common::{AppError, AppResult, IdGenerator};
use civica_db::{
    entities::subject::{self, SubjectKind},
    repositories::SubjectRepository,
};
use sea_orm::Set;

/// Input for creating a subject.
#[derive(Debug, Clone)]
pub struct CreateSubjectInput {
    pub title: String,
    pub kind: SubjectKind,
    pub number: Option<String>,
    pub status: Option<String>,
    pub introduced: Option<NaiveDate>,
}

/// Subject service for business logic.
#[derive(Clone)]
pub struct SubjectService {
    subject_repo: SubjectRepository,
    id_gen: IdGenerator,
}

impl SubjectService {
    /// Create a new subject service.
    #[must_use]
    pub fn new(subject_repo: SubjectRepository) -> Self {
        Self {
            subject_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a subject with zeroed tallies.
    pub async fn create(&self, input: CreateSubjectInput) -> AppResult<subject::Model> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(AppError::BadRequest("Title cannot be empty".to_string()));
        }

        let model = subject::ActiveModel {
            id: Set(self.id_gen.generate()),
            title: Set(title.to_string()),
            kind: Set(input.kind),
            number: Set(input.number),
            status: Set(input.status),
            introduced: Set(input.introduced),
            for_count: Set(0),
            against_count: Set(0),
            created_at: Set(chrono::Utc::now().into()),
        };

        self.subject_repo.create(model).await
    }

    /// Get a subject by ID.
    pub async fn get(&self, id: &str) -> AppResult<subject::Model> {
        self.subject_repo.get_by_id(id).await
    }

    /// List subjects, newest first, optionally filtered by kind.
    pub async fn list(
        &self,
        kind: Option<SubjectKind>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<subject::Model>> {
        self.subject_repo.list(kind, limit.min(100), offset).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    #[tokio::test]
    async fn created_subject_starts_with_zeroed_tallies() {
        let stored = subject::Model {
            id: "s1".to_string(),
            title: "An Act respecting clean air".to_string(),
            kind: SubjectKind::Proposal,
            number: Some("C-12".to_string()),
            status: None,
            introduced: None,
            for_count: 0,
            against_count: 0,
            created_at: Utc::now().into(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[stored]])
                .into_connection(),
        );

        let service = SubjectService::new(SubjectRepository::new(db));
        let subject = service
            .create(CreateSubjectInput {
                title: "An Act respecting clean air".to_string(),
                kind: SubjectKind::Proposal,
                number: Some("C-12".to_string()),
                status: None,
                introduced: None,
            })
            .await
            .unwrap();

        assert_eq!(subject.for_count, 0);
        assert_eq!(subject.against_count, 0);
    }

    #[tokio::test]
    async fn blank_title_is_rejected() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = SubjectService::new(SubjectRepository::new(db));

        let err = service
            .create(CreateSubjectInput {
                title: "  ".to_string(),
                kind: SubjectKind::Poll,
                number: None,
                status: None,
                introduced: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
