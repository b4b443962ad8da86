//! Notification service.

use civica_common::{AppResult, IdGenerator};
use civica_db::{entities::notification, repositories::NotificationRepository};
use sea_orm::Set;

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    id_gen: IdGenerator,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub fn new(notification_repo: NotificationRepository) -> Self {
        Self {
            notification_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Append a notification for a recipient.
    pub async fn emit(&self, recipient_id: &str, body: &str) -> AppResult<notification::Model> {
        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            recipient_id: Set(recipient_id.to_string()),
            body: Set(body.to_string()),
            is_read: Set(false),
            created_at: Set(chrono::Utc::now().into()),
        };

        self.notification_repo.create(model).await
    }

    /// Drain the recipient's unread backlog, oldest first, marking the
    /// returned rows read.
    pub async fn drain_unread(&self, recipient_id: &str) -> AppResult<Vec<notification::Model>> {
        self.notification_repo.drain_unread(recipient_id).await
    }

    /// Drain the recipient's full backlog with pre-drain read state.
    pub async fn drain_all(&self, recipient_id: &str) -> AppResult<Vec<notification::Model>> {
        self.notification_repo.drain_all(recipient_id).await
    }

    /// Count unread notifications for a recipient.
    pub async fn count_unread(&self, recipient_id: &str) -> AppResult<u64> {
        self.notification_repo.count_unread(recipient_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    #[tokio::test]
    async fn emit_appends_an_unread_row() {
        let stored = notification::Model {
            id: "01abc".to_string(),
            recipient_id: "mod1".to_string(),
            body: "alice voted for Bill C-330".to_string(),
            is_read: false,
            created_at: Utc::now().into(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[stored.clone()]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let service = NotificationService::new(NotificationRepository::new(db));
        let created = service.emit("mod1", "alice voted for Bill C-330").await.unwrap();

        assert_eq!(created.recipient_id, "mod1");
        assert!(!created.is_read);
    }
}
