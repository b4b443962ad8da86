//! Comment service.

use crate::services::fanout::FanoutService;
use civica_common::{AppError, AppResult, IdGenerator};
use civica_db::{
    entities::{comment, user},
    repositories::{CommentRepository, SubjectRepository},
};
use sea_orm::Set;

/// Input for creating a comment.
#[derive(Debug, Clone)]
pub struct CreateCommentInput {
    pub subject_id: String,
    pub text: String,
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    subject_repo: SubjectRepository,
    fanout: FanoutService,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub fn new(
        comment_repo: CommentRepository,
        subject_repo: SubjectRepository,
        fanout: FanoutService,
    ) -> Self {
        Self {
            comment_repo,
            subject_repo,
            fanout,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a comment on a subject and fan the event out to moderators.
    pub async fn create(
        &self,
        author: &user::Model,
        input: CreateCommentInput,
    ) -> AppResult<comment::Model> {
        let text = input.text.trim();
        if text.is_empty() {
            return Err(AppError::BadRequest("Comment cannot be empty".to_string()));
        }
        if text.len() > 4096 {
            return Err(AppError::BadRequest(
                "Comment is too long (max 4096 chars)".to_string(),
            ));
        }

        let subject = self.subject_repo.get_by_id(&input.subject_id).await?;

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            subject_id: Set(subject.id.clone()),
            author_id: Set(author.id.clone()),
            text: Set(text.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        let comment = self.comment_repo.create(model).await?;

        self.fanout.announce_comment(author, &subject).await?;

        Ok(comment)
    }

    /// List a subject's comments, oldest first.
    pub async fn list_for_subject(
        &self,
        subject_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<comment::Model>> {
        // Validate the subject before listing
        self.subject_repo.get_by_id(subject_id).await?;
        self.comment_repo
            .find_by_subject(subject_id, limit, offset)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::notification::NotificationService;
    use crate::services::push::NoOpPush;
    use chrono::Utc;
    use civica_db::entities::{subject, user::Role};
    use civica_db::repositories::{NotificationRepository, UserRepository};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn test_author() -> user::Model {
        user::Model {
            id: "user1".to_string(),
            username: "alice".to_string(),
            username_lower: "alice".to_string(),
            email: None,
            name: None,
            password_hash: "$argon2id$stub".to_string(),
            token: None,
            role: Role::Regular,
            created_at: Utc::now().into(),
        }
    }

    fn build_service(db: Arc<sea_orm::DatabaseConnection>) -> CommentService {
        let fanout = FanoutService::new(
            NotificationService::new(NotificationRepository::new(Arc::clone(&db))),
            UserRepository::new(Arc::clone(&db)),
            Arc::new(NoOpPush),
        );
        CommentService::new(
            CommentRepository::new(Arc::clone(&db)),
            SubjectRepository::new(db),
            fanout,
        )
    }

    #[tokio::test]
    async fn empty_comment_is_rejected_before_any_lookup() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = build_service(db);

        let err = service
            .create(
                &test_author(),
                CreateCommentInput {
                    subject_id: "subj1".to_string(),
                    text: "   ".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn comment_on_missing_subject_is_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<subject::Model>::new()])
                .into_connection(),
        );
        let service = build_service(db);

        let err = service
            .create(
                &test_author(),
                CreateCommentInput {
                    subject_id: "missing".to_string(),
                    text: "A fine bill.".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }
}
