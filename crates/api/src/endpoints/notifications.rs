//! Moderator notification endpoints.

use axum::{Router, extract::State, routing::get};
use civica_common::AppResult;
use civica_db::entities::notification;
use serde::Serialize;

use crate::{extractors::AuthModerator, middleware::AppState, response::ApiResponse};

/// Notification view. `is_read` reflects the state before this fetch; the
/// fetch itself marks the returned rows read.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: String,
}

impl From<notification::Model> for NotificationResponse {
    fn from(m: notification::Model) -> Self {
        Self {
            id: m.id,
            body: m.body,
            is_read: m.is_read,
            created_at: m.created_at.to_rfc3339(),
        }
    }
}

/// Fetch the full backlog, oldest first, marking unread rows read.
async fn index(
    AuthModerator(moderator): AuthModerator,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<NotificationResponse>>> {
    let notifications = state.notification_service.drain_all(&moderator.id).await?;

    Ok(ApiResponse::ok(
        notifications
            .into_iter()
            .map(NotificationResponse::from)
            .collect(),
    ))
}

/// Unread count response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub count: u64,
}

/// Count unread notifications without touching their read state.
async fn unread_count(
    AuthModerator(moderator): AuthModerator,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<UnreadCountResponse>> {
    let count = state
        .notification_service
        .count_unread(&moderator.id)
        .await?;

    Ok(ApiResponse::ok(UnreadCountResponse { count }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/unread-count", get(unread_count))
}
