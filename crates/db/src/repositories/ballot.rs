//! Ballot repository: the ballot store.
//!
//! `cast` is the single write path for ballots and for the subject tally
//! counters. Every check and mutation for one cast happens inside one
//! transaction with the subject row locked, so concurrent casts on the same
//! subject serialize and never observe a half-applied state. The unique
//! indexes on (subject, voter) and (subject, origin) back the transactional
//! check-then-insert.

use std::sync::Arc;

use crate::entities::{
    Ballot, Subject, ballot,
    subject::{self, SubjectKind},
};
use chrono::Utc;
use civica_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, Set,
    TransactionError, TransactionTrait,
};

/// Input for casting a ballot.
#[derive(Debug, Clone)]
pub struct CastBallot {
    /// Pre-generated ID used if a new ballot row is created.
    pub ballot_id: String,
    pub voter_id: String,
    pub subject_id: String,
    pub choice: bool,
    pub origin: Option<String>,
    pub origin_label: Option<String>,
}

/// Result of a cast.
#[derive(Debug, Clone)]
pub enum CastOutcome {
    /// A ballot was created or its choice flipped; counters were adjusted.
    Recorded {
        ballot: ballot::Model,
        subject: subject::Model,
        /// true when an existing ballot changed choice
        flipped: bool,
    },
    /// Same voter, same choice: idempotent no-op. Callers must not emit a
    /// notification or touch counters for this outcome.
    Unchanged {
        ballot: ballot::Model,
        subject: subject::Model,
    },
}

impl CastOutcome {
    /// The subject with its current counters.
    #[must_use]
    pub const fn subject(&self) -> &subject::Model {
        match self {
            Self::Recorded { subject, .. } | Self::Unchanged { subject, .. } => subject,
        }
    }

    /// The ballot as stored after the call.
    #[must_use]
    pub const fn ballot(&self) -> &ballot::Model {
        match self {
            Self::Recorded { ballot, .. } | Self::Unchanged { ballot, .. } => ballot,
        }
    }

    /// Whether this cast changed state (and should be fanned out).
    #[must_use]
    pub const fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded { .. })
    }
}

/// Compute the tally counters after applying a cast.
///
/// `previous` is the voter's stored choice, if any. A repeated identical
/// choice leaves both counters untouched; a flip moves exactly one ballot
/// between the two counters; a fresh ballot adds exactly one.
const fn next_counts(
    for_count: i32,
    against_count: i32,
    previous: Option<bool>,
    choice: bool,
) -> (i32, i32) {
    match (previous, choice) {
        (Some(true), true) | (Some(false), false) => (for_count, against_count),
        (Some(true), false) => (for_count - 1, against_count + 1),
        (Some(false), true) => (for_count + 1, against_count - 1),
        (None, true) => (for_count + 1, against_count),
        (None, false) => (for_count, against_count + 1),
    }
}

/// Ballot repository for database operations.
#[derive(Clone)]
pub struct BallotRepository {
    db: Arc<DatabaseConnection>,
}

impl BallotRepository {
    /// Create a new ballot repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a voter's ballot on a subject.
    pub async fn find_by_voter_and_subject(
        &self,
        voter_id: &str,
        subject_id: &str,
    ) -> AppResult<Option<ballot::Model>> {
        Ballot::find()
            .filter(ballot::Column::SubjectId.eq(subject_id))
            .filter(ballot::Column::VoterId.eq(voter_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Cast a vote: create, flip, or no-op one ballot and keep the subject
    /// counters consistent, all as one atomic unit.
    pub async fn cast(&self, input: CastBallot) -> AppResult<CastOutcome> {
        let result = self
            .db
            .transaction::<_, CastOutcome, AppError>(move |txn| {
                Box::pin(async move {
                    // Lock the subject row first; all casts on one subject
                    // serialize here.
                    let subject = Subject::find_by_id(&input.subject_id)
                        .lock_exclusive()
                        .one(txn)
                        .await
                        .map_err(|e| AppError::Database(e.to_string()))?
                        .ok_or_else(|| {
                            AppError::NotFound(format!("Subject not found: {}", input.subject_id))
                        })?;

                    if subject.kind == SubjectKind::Poll && input.origin.is_none() {
                        return Err(AppError::BadRequest(
                            "An origin is required to vote on a poll".to_string(),
                        ));
                    }

                    let existing = Ballot::find()
                        .filter(ballot::Column::SubjectId.eq(&input.subject_id))
                        .filter(ballot::Column::VoterId.eq(&input.voter_id))
                        .one(txn)
                        .await
                        .map_err(|e| AppError::Database(e.to_string()))?;

                    if let Some(found) = existing {
                        if found.choice == input.choice {
                            return Ok(CastOutcome::Unchanged {
                                ballot: found,
                                subject,
                            });
                        }

                        let (for_count, against_count) = next_counts(
                            subject.for_count,
                            subject.against_count,
                            Some(found.choice),
                            input.choice,
                        );

                        let mut ballot_active: ballot::ActiveModel = found.into();
                        ballot_active.choice = Set(input.choice);
                        ballot_active.updated_at = Set(Some(Utc::now().into()));
                        let ballot = ballot_active
                            .update(txn)
                            .await
                            .map_err(|e| AppError::Database(e.to_string()))?;

                        let mut subject_active: subject::ActiveModel = subject.into();
                        subject_active.for_count = Set(for_count);
                        subject_active.against_count = Set(against_count);
                        let subject = subject_active
                            .update(txn)
                            .await
                            .map_err(|e| AppError::Database(e.to_string()))?;

                        return Ok(CastOutcome::Recorded {
                            ballot,
                            subject,
                            flipped: true,
                        });
                    }

                    // Poll anti-stuffing: a ballot from the same origin blocks
                    // a fresh ballot regardless of which voter is asking.
                    if subject.kind == SubjectKind::Poll
                        && let Some(ref origin) = input.origin
                    {
                        let stuffed = Ballot::find()
                            .filter(ballot::Column::SubjectId.eq(&input.subject_id))
                            .filter(ballot::Column::Origin.eq(origin.as_str()))
                            .one(txn)
                            .await
                            .map_err(|e| AppError::Database(e.to_string()))?;

                        if stuffed.is_some() {
                            return Err(AppError::DuplicateOrigin(origin.clone()));
                        }
                    }

                    let (for_count, against_count) = next_counts(
                        subject.for_count,
                        subject.against_count,
                        None,
                        input.choice,
                    );

                    let ballot = ballot::ActiveModel {
                        id: Set(input.ballot_id.clone()),
                        subject_id: Set(input.subject_id.clone()),
                        voter_id: Set(input.voter_id.clone()),
                        choice: Set(input.choice),
                        origin: Set(input.origin.clone()),
                        origin_label: Set(input.origin_label.clone()),
                        created_at: Set(Utc::now().into()),
                        updated_at: Set(None),
                    }
                    .insert(txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;

                    let mut subject_active: subject::ActiveModel = subject.into();
                    subject_active.for_count = Set(for_count);
                    subject_active.against_count = Set(against_count);
                    let subject = subject_active
                        .update(txn)
                        .await
                        .map_err(|e| AppError::Database(e.to_string()))?;

                    Ok(CastOutcome::Recorded {
                        ballot,
                        subject,
                        flipped: false,
                    })
                })
            })
            .await;

        match result {
            Ok(outcome) => Ok(outcome),
            Err(TransactionError::Connection(e)) => Err(AppError::Database(e.to_string())),
            Err(TransactionError::Transaction(e)) => Err(e),
        }
    }
}
