//! Notification repository: the notification ledger.
//!
//! Append-only rows; the only mutation is the read flip performed by a
//! drain. A drain marks exactly the rows it returns, so a row created
//! concurrently is left for the next drain and nothing is acknowledged
//! without being delivered.

use std::sync::Arc;

use crate::entities::{Notification, notification};
use civica_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionError, TransactionTrait,
};

/// Notification repository for database operations.
#[derive(Clone)]
pub struct NotificationRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationRepository {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Append a notification row. No dedup: repeated emits create repeated
    /// rows; this feed is at-least-once by design.
    pub async fn create(&self, model: notification::ActiveModel) -> AppResult<notification::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Drain the recipient's unread backlog: return unread rows in creation
    /// order and mark exactly those rows read, as one transaction.
    pub async fn drain_unread(&self, recipient_id: &str) -> AppResult<Vec<notification::Model>> {
        let recipient_id = recipient_id.to_string();
        let result = self
            .db
            .transaction::<_, Vec<notification::Model>, AppError>(move |txn| {
                Box::pin(async move {
                    let rows = Notification::find()
                        .filter(notification::Column::RecipientId.eq(&recipient_id))
                        .filter(notification::Column::IsRead.eq(false))
                        .order_by_asc(notification::Column::Id)
                        .lock_exclusive()
                        .all(txn)
                        .await
                        .map_err(|e| AppError::Database(e.to_string()))?;

                    Self::mark_read(txn, &rows).await?;
                    Ok(rows)
                })
            })
            .await;

        Self::unwrap_txn(result)
    }

    /// Drain the recipient's full backlog: return every row in creation
    /// order with its pre-drain read state, marking the unread ones read.
    pub async fn drain_all(&self, recipient_id: &str) -> AppResult<Vec<notification::Model>> {
        let recipient_id = recipient_id.to_string();
        let result = self
            .db
            .transaction::<_, Vec<notification::Model>, AppError>(move |txn| {
                Box::pin(async move {
                    let rows = Notification::find()
                        .filter(notification::Column::RecipientId.eq(&recipient_id))
                        .order_by_asc(notification::Column::Id)
                        .lock_exclusive()
                        .all(txn)
                        .await
                        .map_err(|e| AppError::Database(e.to_string()))?;

                    Self::mark_read(txn, &rows).await?;
                    Ok(rows)
                })
            })
            .await;

        Self::unwrap_txn(result)
    }

    /// Count unread notifications for a recipient.
    pub async fn count_unread(&self, recipient_id: &str) -> AppResult<u64> {
        Notification::find()
            .filter(notification::Column::RecipientId.eq(recipient_id))
            .filter(notification::Column::IsRead.eq(false))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark the unread rows of a drained snapshot as read. Only IDs from the
    /// snapshot are touched; rows created after it stay unread.
    async fn mark_read(
        txn: &sea_orm::DatabaseTransaction,
        rows: &[notification::Model],
    ) -> AppResult<()> {
        let unread_ids: Vec<&str> = rows
            .iter()
            .filter(|n| !n.is_read)
            .map(|n| n.id.as_str())
            .collect();

        if unread_ids.is_empty() {
            return Ok(());
        }

        Notification::update_many()
            .filter(notification::Column::Id.is_in(unread_ids))
            .col_expr(notification::Column::IsRead, true.into())
            .exec(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    fn unwrap_txn<T>(result: Result<T, TransactionError<AppError>>) -> AppResult<T> {
        match result {
            Ok(v) => Ok(v),
            Err(TransactionError::Connection(e)) => Err(AppError::Database(e.to_string())),
            Err(TransactionError::Transaction(e)) => Err(e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn test_notification(id: &str, is_read: bool) -> notification::Model {
        notification::Model {
            id: id.to_string(),
            recipient_id: "mod1".to_string(),
            body: format!("event {id}"),
            is_read,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn drain_unread_returns_rows_in_creation_order() {
        // ULIDs sort by creation time, so id order is creation order
        let n1 = test_notification("01aaa", false);
        let n2 = test_notification("01bbb", false);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[n1.clone(), n2.clone()]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 2,
                }])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        let drained = repo.drain_unread("mod1").await.unwrap();

        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].id, "01aaa");
        assert_eq!(drained[1].id, "01bbb");
    }

    #[tokio::test]
    async fn drain_unread_with_empty_backlog_marks_nothing() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<notification::Model>::new()])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        let drained = repo.drain_unread("mod1").await.unwrap();

        assert!(drained.is_empty());
        // No UPDATE was issued: the exec queue was empty and the call
        // still succeeded.
    }

    #[tokio::test]
    async fn drain_all_reports_pre_drain_read_state() {
        let read_row = test_notification("01aaa", true);
        let unread_row = test_notification("01bbb", false);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[read_row, unread_row]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        let drained = repo.drain_all("mod1").await.unwrap();

        assert_eq!(drained.len(), 2);
        // The response reflects the state before the flip side effect
        assert!(drained[0].is_read);
        assert!(!drained[1].is_read);
    }
}
