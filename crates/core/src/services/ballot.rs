//! Ballot service.

use std::net::IpAddr;

use crate::services::fanout::FanoutService;
use civica_common::{AppResult, IdGenerator};
use civica_db::{
    entities::user,
    repositories::{BallotRepository, CastBallot, CastOutcome},
};

/// Ballot service for business logic.
#[derive(Clone)]
pub struct BallotService {
    ballot_repo: BallotRepository,
    fanout: FanoutService,
    id_gen: IdGenerator,
}

impl BallotService {
    /// Create a new ballot service.
    #[must_use]
    pub fn new(ballot_repo: BallotRepository, fanout: FanoutService) -> Self {
        Self {
            ballot_repo,
            fanout,
            id_gen: IdGenerator::new(),
        }
    }

    /// Cast a vote on a subject and, if state changed, fan the event out to
    /// moderators. Duplicate identical votes are a quiet no-op: no counter
    /// change and no notification.
    pub async fn cast_vote(
        &self,
        voter: &user::Model,
        subject_id: &str,
        choice: bool,
        origin: Option<&str>,
    ) -> AppResult<CastOutcome> {
        let outcome = self
            .ballot_repo
            .cast(CastBallot {
                ballot_id: self.id_gen.generate(),
                voter_id: voter.id.clone(),
                subject_id: subject_id.to_string(),
                choice,
                origin: origin.map(ToString::to_string),
                origin_label: origin.and_then(origin_label),
            })
            .await?;

        if let CastOutcome::Recorded {
            ballot,
            subject,
            flipped,
        } = &outcome
        {
            self.fanout
                .announce_vote(voter, subject, ballot.choice, *flipped)
                .await?;
        }

        Ok(outcome)
    }
}

/// Coarse location label for a network origin. Recorded alongside poll
/// ballots for later review; never used for enforcement.
fn origin_label(origin: &str) -> Option<String> {
    let ip: IpAddr = origin.parse().ok()?;

    let label = match ip {
        IpAddr::V4(v4) if v4.is_loopback() || v4.is_private() => "internal",
        IpAddr::V6(v6) if v6.is_loopback() => "internal",
        _ => "external",
    };

    Some(label.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::notification::NotificationService;
    use crate::services::push::ModeratorPush;
    use async_trait::async_trait;
    use chrono::Utc;
    use civica_db::entities::{ballot, notification, subject, subject::SubjectKind, user::Role};
    use civica_db::repositories::{NotificationRepository, UserRepository};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::{Arc, Mutex};

    struct RecordingPush {
        messages: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ModeratorPush for RecordingPush {
        async fn broadcast_to_moderators(&self, message: &str) -> usize {
            self.messages.lock().unwrap().push(message.to_string());
            1
        }
    }

    fn test_user(id: &str, username: &str, role: Role) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            email: None,
            name: None,
            password_hash: "$argon2id$stub".to_string(),
            token: None,
            role,
            created_at: Utc::now().into(),
        }
    }

    fn test_subject(for_count: i32, against_count: i32) -> subject::Model {
        subject::Model {
            id: "subj1".to_string(),
            title: "An Act respecting clean water".to_string(),
            kind: SubjectKind::Proposal,
            number: Some("C-330".to_string()),
            status: None,
            introduced: None,
            for_count,
            against_count,
            created_at: Utc::now().into(),
        }
    }

    fn test_ballot(choice: bool) -> ballot::Model {
        ballot::Model {
            id: "ballot1".to_string(),
            subject_id: "subj1".to_string(),
            voter_id: "voter1".to_string(),
            choice,
            origin: None,
            origin_label: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn build_service(db: Arc<sea_orm::DatabaseConnection>, push: Arc<RecordingPush>) -> BallotService {
        let fanout = FanoutService::new(
            NotificationService::new(NotificationRepository::new(Arc::clone(&db))),
            UserRepository::new(Arc::clone(&db)),
            push,
        );
        BallotService::new(BallotRepository::new(db), fanout)
    }

    #[tokio::test]
    async fn duplicate_vote_emits_no_notification() {
        let push = Arc::new(RecordingPush {
            messages: Mutex::new(Vec::new()),
        });

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_subject(1, 0)]])
                .append_query_results([[test_ballot(true)]])
                .into_connection(),
        );

        let service = build_service(db, push.clone());
        let voter = test_user("voter1", "alice", Role::Regular);

        let outcome = service.cast_vote(&voter, "subj1", true, None).await.unwrap();

        assert!(!outcome.is_recorded());
        assert!(push.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn recorded_vote_fans_out_to_moderators() {
        let push = Arc::new(RecordingPush {
            messages: Mutex::new(Vec::new()),
        });

        let stored_notification = notification::Model {
            id: "01abc".to_string(),
            recipient_id: "mod1".to_string(),
            body: "alice voted for Bill C-330".to_string(),
            is_read: false,
            created_at: Utc::now().into(),
        };

        let mut counted = test_subject(0, 0);
        counted.for_count = 1;

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // cast transaction: subject, no existing ballot, insert, tally
                .append_query_results([[test_subject(0, 0)]])
                .append_query_results([Vec::<ballot::Model>::new()])
                .append_query_results([[test_ballot(true)]])
                .append_query_results([[counted]])
                // fan-out: moderator set, one ledger insert
                .append_query_results([[test_user("mod1", "maude", Role::Moderator)]])
                .append_query_results([[stored_notification]])
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

        let service = build_service(db, push.clone());
        let voter = test_user("voter1", "alice", Role::Regular);

        let outcome = service.cast_vote(&voter, "subj1", true, None).await.unwrap();

        assert!(outcome.is_recorded());
        assert_eq!(outcome.subject().for_count, 1);

        let pushed = push.messages.lock().unwrap().clone();
        assert_eq!(pushed, vec!["alice voted for Bill C-330".to_string()]);
    }

    #[test]
    fn origin_labels_classify_addresses() {
        assert_eq!(origin_label("127.0.0.1").as_deref(), Some("internal"));
        assert_eq!(origin_label("192.168.1.20").as_deref(), Some("internal"));
        assert_eq!(origin_label("203.0.113.9").as_deref(), Some("external"));
        assert_eq!(origin_label("not-an-address"), None);
    }
}
