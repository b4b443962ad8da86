//! Subject and vote endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, post},
};
use chrono::NaiveDate;
use civica_common::AppResult;
use civica_db::entities::subject::{self, SubjectKind};
use civica_db::entities::ballot;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    extractors::{AuthModerator, AuthUser},
    middleware::AppState,
    response::ApiResponse,
};

/// Subject view.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectResponse {
    pub id: String,
    pub title: String,
    pub kind: SubjectKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub introduced: Option<NaiveDate>,
    pub for_count: i32,
    pub against_count: i32,
    pub created_at: String,
}

impl From<subject::Model> for SubjectResponse {
    fn from(m: subject::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            kind: m.kind,
            number: m.number,
            status: m.status,
            introduced: m.introduced,
            for_count: m.for_count,
            against_count: m.against_count,
            created_at: m.created_at.to_rfc3339(),
        }
    }
}

/// List query parameters.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub kind: Option<SubjectKind>,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

const fn default_limit() -> u64 {
    30
}

/// List subjects, newest first.
async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Vec<SubjectResponse>>> {
    let subjects = state
        .subject_service
        .list(query.kind, query.limit, query.offset)
        .await?;

    Ok(ApiResponse::ok(
        subjects.into_iter().map(SubjectResponse::from).collect(),
    ))
}

/// Get a single subject.
async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<SubjectResponse>> {
    let subject = state.subject_service.get(&id).await?;
    Ok(ApiResponse::ok(subject.into()))
}

/// Create subject request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubjectRequest {
    #[validate(length(min = 1, max = 512))]
    pub title: String,

    pub kind: SubjectKind,

    #[validate(length(max = 32))]
    pub number: Option<String>,

    #[validate(length(max = 128))]
    pub status: Option<String>,

    pub introduced: Option<NaiveDate>,
}

/// Create a subject. Moderators only.
async fn create(
    AuthModerator(_moderator): AuthModerator,
    State(state): State<AppState>,
    Json(req): Json<CreateSubjectRequest>,
) -> AppResult<ApiResponse<SubjectResponse>> {
    req.validate()?;

    let subject = state
        .subject_service
        .create(civica_core::subject::CreateSubjectInput {
            title: req.title,
            kind: req.kind,
            number: req.number,
            status: req.status,
            introduced: req.introduced,
        })
        .await?;

    Ok(ApiResponse::ok(subject.into()))
}

/// A vote stance.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    For,
    Against,
}

impl Stance {
    const fn as_bool(self) -> bool {
        matches!(self, Self::For)
    }
}

/// Vote request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub choice: Stance,
}

/// The caller's stored ballot after a cast.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotResponse {
    pub id: String,
    pub choice: Stance,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl From<&ballot::Model> for BallotResponse {
    fn from(m: &ballot::Model) -> Self {
        Self {
            id: m.id.clone(),
            choice: if m.choice { Stance::For } else { Stance::Against },
            created_at: m.created_at.to_rfc3339(),
            updated_at: m.updated_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Vote response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    /// `recorded` when state changed, `unchanged` for a duplicate
    /// identical vote.
    pub outcome: &'static str,
    pub ballot: BallotResponse,
    pub subject: SubjectResponse,
}

/// Cast a vote on a subject.
async fn vote(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<VoteRequest>,
) -> AppResult<ApiResponse<VoteResponse>> {
    let origin = client_origin(&headers);

    let outcome = state
        .ballot_service
        .cast_vote(&user, &id, req.choice.as_bool(), origin.as_deref())
        .await?;

    let label = if outcome.is_recorded() {
        "recorded"
    } else {
        "unchanged"
    };

    Ok(ApiResponse::ok(VoteResponse {
        outcome: label,
        ballot: outcome.ballot().into(),
        subject: outcome.subject().clone().into(),
    }))
}

/// Extract the client's network origin from proxy headers.
fn client_origin(headers: &HeaderMap) -> Option<String> {
    if let Some(xff) = headers.get("x-forwarded-for")
        && let Ok(xff_str) = xff.to_str()
        && let Some(first) = xff_str.split(',').next()
    {
        let first = first.trim();
        if !first.is_empty() {
            return Some(first.to_string());
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip")
        && let Ok(ip_str) = real_ip.to_str()
        && !ip_str.trim().is_empty()
    {
        return Some(ip_str.trim().to_string());
    }

    None
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show))
        .route("/{id}/vote", post(vote))
        .merge(super::comments::router())
}
