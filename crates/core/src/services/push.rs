//! Live push abstraction.
//!
//! Core services hand completed notifications to whatever holds the live
//! connections without depending on the API layer. The connection registry
//! in `civica-api` is the real implementation.

use async_trait::async_trait;
use std::sync::Arc;

/// Trait for best-effort live delivery to connected moderators.
#[async_trait]
pub trait ModeratorPush: Send + Sync {
    /// Push `message` to every currently connected moderator.
    ///
    /// Best-effort: individual connection failures are handled by the
    /// implementation and never surfaced here. Returns the number of
    /// connections the message was handed to.
    async fn broadcast_to_moderators(&self, message: &str) -> usize;
}

/// Shared handle to a push implementation.
pub type PushHandle = Arc<dyn ModeratorPush>;

/// Push implementation that drops everything. Used when no real-time layer
/// is wired up (tests, offline tools); the durable ledger still records
/// every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpPush;

#[async_trait]
impl ModeratorPush for NoOpPush {
    async fn broadcast_to_moderators(&self, _message: &str) -> usize {
        0
    }
}
