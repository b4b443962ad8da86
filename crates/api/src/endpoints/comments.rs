//! Comment endpoints, nested under a subject.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use civica_common::AppResult;
use civica_db::entities::comment;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Comment view.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub subject_id: String,
    pub author_id: String,
    pub text: String,
    pub created_at: String,
}

impl From<comment::Model> for CommentResponse {
    fn from(m: comment::Model) -> Self {
        Self {
            id: m.id,
            subject_id: m.subject_id,
            author_id: m.author_id,
            text: m.text,
            created_at: m.created_at.to_rfc3339(),
        }
    }
}

/// List query parameters.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

const fn default_limit() -> u64 {
    50
}

/// List a subject's comments, oldest first.
async fn list(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Vec<CommentResponse>>> {
    let comments = state
        .comment_service
        .list_for_subject(&id, query.limit, query.offset)
        .await?;

    Ok(ApiResponse::ok(
        comments.into_iter().map(CommentResponse::from).collect(),
    ))
}

/// Create comment request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 4096))]
    pub text: String,
}

/// Post a comment on a subject.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<ApiResponse<CommentResponse>> {
    req.validate()?;

    let comment = state
        .comment_service
        .create(
            &user,
            civica_core::comment::CreateCommentInput {
                subject_id: id,
                text: req.text,
            },
        )
        .await?;

    Ok(ApiResponse::ok(comment.into()))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/{id}/comments", get(list).post(create))
}
