//! Fan-out coordinator.
//!
//! Turns a completed vote or comment into moderator notifications: one
//! durable ledger row per current moderator, then one best-effort live
//! broadcast. The ledger write happens strictly before the broadcast, so a
//! moderator who is offline during the push still finds the message in
//! their backlog on reconnect.

use crate::services::notification::NotificationService;
use crate::services::push::PushHandle;
use civica_common::AppResult;
use civica_db::{
    entities::{subject, user},
    repositories::UserRepository,
};

/// Fan-out coordinator for moderator notifications.
#[derive(Clone)]
pub struct FanoutService {
    notification_service: NotificationService,
    user_repo: UserRepository,
    push: PushHandle,
}

impl FanoutService {
    /// Create a new fan-out coordinator.
    #[must_use]
    pub fn new(
        notification_service: NotificationService,
        user_repo: UserRepository,
        push: PushHandle,
    ) -> Self {
        Self {
            notification_service,
            user_repo,
            push,
        }
    }

    /// Notify moderators of a recorded vote.
    pub async fn announce_vote(
        &self,
        voter: &user::Model,
        subject: &subject::Model,
        choice: bool,
        flipped: bool,
    ) -> AppResult<usize> {
        let stance = if choice { "for" } else { "against" };
        let message = if flipped {
            format!(
                "{} changed their vote to {} on {}",
                voter.username,
                stance,
                subject_label(subject)
            )
        } else {
            format!(
                "{} voted {} {}",
                voter.username,
                stance,
                subject_label(subject)
            )
        };

        self.announce(&message).await
    }

    /// Notify moderators of a new comment.
    pub async fn announce_comment(
        &self,
        author: &user::Model,
        subject: &subject::Model,
    ) -> AppResult<usize> {
        let message = format!(
            "{} commented on {}",
            author.username,
            subject_label(subject)
        );

        self.announce(&message).await
    }

    /// Write one ledger row per current moderator, then broadcast to the
    /// connected ones. A ledger failure fails the whole call before any
    /// broadcast is attempted.
    pub async fn announce(&self, message: &str) -> AppResult<usize> {
        let moderators = self.user_repo.find_moderators().await?;

        for moderator in &moderators {
            self.notification_service.emit(&moderator.id, message).await?;
        }

        let delivered = self.push.broadcast_to_moderators(message).await;

        tracing::debug!(
            recipients = moderators.len(),
            delivered = delivered,
            "Fanned out moderator notification"
        );

        Ok(delivered)
    }
}

/// Human-readable label for a subject: its bill number when present,
/// otherwise its title.
fn subject_label(subject: &subject::Model) -> String {
    subject.number.as_ref().map_or_else(
        || format!("\"{}\"", subject.title),
        |number| format!("Bill {number}"),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::push::ModeratorPush;
    use async_trait::async_trait;
    use chrono::Utc;
    use civica_db::entities::{notification, subject::SubjectKind, user::Role};
    use civica_db::repositories::NotificationRepository;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::{Arc, Mutex};

    struct RecordingPush {
        messages: Mutex<Vec<String>>,
    }

    impl RecordingPush {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                messages: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ModeratorPush for RecordingPush {
        async fn broadcast_to_moderators(&self, message: &str) -> usize {
            self.messages.lock().unwrap().push(message.to_string());
            1
        }
    }

    fn test_moderator(id: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: format!("mod_{id}"),
            username_lower: format!("mod_{id}"),
            email: None,
            name: None,
            password_hash: "$argon2id$stub".to_string(),
            token: None,
            role: Role::Moderator,
            created_at: Utc::now().into(),
        }
    }

    fn test_subject() -> subject::Model {
        subject::Model {
            id: "subj1".to_string(),
            title: "An Act respecting clean water".to_string(),
            kind: SubjectKind::Proposal,
            number: Some("C-330".to_string()),
            status: None,
            introduced: None,
            for_count: 1,
            against_count: 0,
            created_at: Utc::now().into(),
        }
    }

    fn test_voter() -> user::Model {
        user::Model {
            id: "voter1".to_string(),
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

    fn stored_notification(id: &str, recipient: &str) -> notification::Model {
        notification::Model {
            id: id.to_string(),
            recipient_id: recipient.to_string(),
            body: "alice voted for Bill C-330".to_string(),
            is_read: false,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn announces_to_every_moderator_then_broadcasts() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // moderator set resolved at emit time
                .append_query_results([[test_moderator("mod1"), test_moderator("mod2")]])
                // one insert per moderator
                .append_query_results([[stored_notification("01a", "mod1")]])
                .append_query_results([[stored_notification("01b", "mod2")]])
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                ])
                .into_connection(),
        );

        let push = RecordingPush::new();
        let service = FanoutService::new(
            NotificationService::new(NotificationRepository::new(Arc::clone(&db))),
            UserRepository::new(db),
            push.clone(),
        );

        service
            .announce_vote(&test_voter(), &test_subject(), true, false)
            .await
            .unwrap();

        let pushed = push.messages.lock().unwrap().clone();
        assert_eq!(pushed, vec!["alice voted for Bill C-330".to_string()]);
    }

    #[tokio::test]
    async fn ledger_failure_skips_the_broadcast() {
        // Moderators resolve, but the ledger insert has no mocked result and
        // errors out; the push must never fire.
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_moderator("mod1")]])
                .into_connection(),
        );

        let push = RecordingPush::new();
        let service = FanoutService::new(
            NotificationService::new(NotificationRepository::new(Arc::clone(&db))),
            UserRepository::new(db),
            push.clone(),
        );

        let result = service.announce("event").await;

        assert!(result.is_err());
        assert!(push.messages.lock().unwrap().is_empty());
    }

    #[test]
    fn vote_messages_name_the_stance_and_subject() {
        let subject = test_subject();
        assert_eq!(subject_label(&subject), "Bill C-330");

        let mut untitled = subject;
        untitled.number = None;
        assert_eq!(
            subject_label(&untitled),
            "\"An Act respecting clean water\""
        );
    }
}
