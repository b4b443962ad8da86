//! ID generation utilities.

use std::sync::{Arc, Mutex, PoisonError};

use ulid::{Generator, Ulid};
use uuid::Uuid;

/// ID generator for entities.
///
/// Clones share one underlying ULID generator, so IDs handed out by any
/// clone of the same instance stay in strict creation order.
#[derive(Clone)]
pub struct IdGenerator {
    ulids: Arc<Mutex<Generator>>,
}

impl std::fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdGenerator").finish_non_exhaustive()
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ulids: Arc::new(Mutex::new(Generator::new())),
        }
    }

    /// Generate a new ULID-based ID.
    ///
    /// ULIDs are:
    /// - Lexicographically sortable
    /// - Strictly increasing, even within the same millisecond
    /// - Shorter than UUIDs when represented as strings
    ///
    /// Notification backlog ordering relies on this: ordering rows by ID
    /// ascending yields creation order. A bare `Ulid::new()` would not be
    /// enough, its random component is not monotonic within a millisecond.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut ulids = self.ulids.lock().unwrap_or_else(PoisonError::into_inner);
        // The generator only fails when its random component overflows
        // within one millisecond; a fresh ULID is still unique then.
        let ulid = ulids.generate().unwrap_or_else(|_| Ulid::new());
        ulid.to_string().to_lowercase()
    }

    /// Generate a cryptographically secure random token.
    #[must_use]
    pub fn generate_token(&self) -> String {
        // UUID v4 for tokens (no time component)
        Uuid::new_v4().simple().to_string()
    }
}
