//! API endpoints.

mod auth;
mod comments;
mod notifications;
mod subjects;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/subjects", subjects::router())
        .nest("/notifications", notifications::router())
}
