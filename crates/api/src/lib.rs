//! HTTP API layer for civica.
//!
//! This crate provides the REST API and real-time streaming:
//!
//! - **Endpoints**: accounts, subjects, votes, comments, notifications
//! - **Extractors**: authentication
//! - **Middleware**: token auth, logging, CORS
//! - **Registry**: live WebSocket connection bookkeeping
//! - **Streaming**: the moderator notification WebSocket
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod registry;
pub mod response;
pub mod streaming;

pub use endpoints::router;
pub use registry::{ConnectionGuard, ConnectionId, ConnectionRegistry};
pub use streaming::streaming_handler;
