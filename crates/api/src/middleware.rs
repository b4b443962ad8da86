//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use civica_core::{BallotService, CommentService, NotificationService, SubjectService, UserService};

use crate::registry::ConnectionRegistry;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub subject_service: SubjectService,
    pub ballot_service: BallotService,
    pub comment_service: CommentService,
    pub notification_service: NotificationService,
    pub registry: Arc<ConnectionRegistry>,
}

/// Authentication middleware.
///
/// Resolves a `Bearer` token to its user and stashes the user in request
/// extensions for the extractors. Requests without a valid token pass
/// through unauthenticated; the extractors decide whether that is an error.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
        && let Ok(user) = state.user_service.authenticate_by_token(token).await
    {
        req.extensions_mut().insert(user);
    }

    next.run(req).await
}
