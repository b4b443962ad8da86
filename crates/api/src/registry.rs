//! Live WebSocket connection bookkeeping.
//!
//! Every accepted streaming connection is registered here with its
//! authenticated user and an outbound channel. Fan-out resolves the
//! moderator recipient set against this registry at broadcast time, so a
//! connection opened after an event sees only the durable backlog, never a
//! duplicate live push.

use std::collections::HashMap;
use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use civica_core::ModeratorPush;
use civica_db::entities::user::Role;
use tokio::sync::mpsc;
use tracing::debug;

/// Opaque handle for a registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

/// A single registered connection.
struct Connection {
    user_id: String,
    role: Role,
    tx: mpsc::UnboundedSender<String>,
}

/// Registry of live streaming connections.
///
/// All methods are synchronous and take the lock briefly; the lock is never
/// held across an await point.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<ConnectionId, Connection>>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection, returning a guard that unregisters it on drop.
    ///
    /// The guard survives every exit path of the socket task, including
    /// panics, so a dropped connection can never linger in the registry.
    pub fn register(
        self: Arc<Self>,
        user_id: &str,
        role: Role,
        tx: mpsc::UnboundedSender<String>,
    ) -> ConnectionGuard {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));

        self.lock().insert(
            id,
            Connection {
                user_id: user_id.to_string(),
                role,
                tx,
            },
        );

        debug!(user_id = %user_id, connection_id = id.0, "Connection registered");

        ConnectionGuard { registry: self, id }
    }

    /// Remove a connection. Safe to call for an already-removed ID.
    pub fn unregister(&self, id: ConnectionId) {
        if let Some(conn) = self.lock().remove(&id) {
            debug!(user_id = %conn.user_id, connection_id = id.0, "Connection unregistered");
        }
    }

    /// Send a message to every connected moderator, pruning connections
    /// whose receiving task has gone away. Returns the delivery count.
    pub fn broadcast_moderators(&self, message: &str) -> usize {
        let mut connections = self.lock();

        let mut delivered = 0;
        let mut dead = Vec::new();

        for (id, conn) in connections.iter() {
            if !conn.role.is_moderator() {
                continue;
            }
            if conn.tx.send(message.to_string()).is_ok() {
                delivered += 1;
            } else {
                dead.push(*id);
            }
        }

        for id in dead {
            if let Some(conn) = connections.remove(&id) {
                debug!(user_id = %conn.user_id, connection_id = id.0, "Pruned dead connection");
            }
        }

        delivered
    }

    /// Number of live connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the registry has no live connections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ConnectionId, Connection>> {
        // A poisoned lock only means a panic elsewhere; the map itself is
        // still consistent since every critical section is a plain
        // insert/remove/iterate.
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ModeratorPush for ConnectionRegistry {
    async fn broadcast_to_moderators(&self, message: &str) -> usize {
        self.broadcast_moderators(message)
    }
}

/// Unregisters its connection when dropped.
pub struct ConnectionGuard {
    registry: Arc<ConnectionRegistry>,
    id: ConnectionId,
}

impl ConnectionGuard {
    /// The guarded connection's ID.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn channel() -> (
        mpsc::UnboundedSender<String>,
        mpsc::UnboundedReceiver<String>,
    ) {
        mpsc::unbounded_channel()
    }

    #[tokio::test]
    async fn broadcast_reaches_moderators_only() {
        let registry = Arc::new(ConnectionRegistry::new());

        let (mod_tx, mut mod_rx) = channel();
        let (user_tx, mut user_rx) = channel();

        let _g1 = Arc::clone(&registry).register("mod1", Role::Moderator, mod_tx);
        let _g2 = Arc::clone(&registry).register("user1", Role::Regular, user_tx);

        let delivered = registry.broadcast_moderators("hello");

        assert_eq!(delivered, 1);
        assert_eq!(mod_rx.try_recv().unwrap(), "hello");
        assert!(user_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn dead_connections_are_pruned_during_broadcast() {
        let registry = Arc::new(ConnectionRegistry::new());

        let (tx1, mut rx1) = channel();
        let (dead_tx, dead_rx) = channel();
        let (tx3, mut rx3) = channel();
        drop(dead_rx);

        let _g1 = Arc::clone(&registry).register("mod1", Role::Moderator, tx1);
        let _g2 = Arc::clone(&registry).register("mod2", Role::Moderator, dead_tx);
        let _g3 = Arc::clone(&registry).register("mod3", Role::Moderator, tx3);
        assert_eq!(registry.len(), 3);

        let delivered = registry.broadcast_moderators("ping");

        assert_eq!(delivered, 2);
        assert_eq!(registry.len(), 2);
        assert_eq!(rx1.try_recv().unwrap(), "ping");
        assert_eq!(rx3.try_recv().unwrap(), "ping");
    }

    #[tokio::test]
    async fn guard_unregisters_on_drop_and_is_idempotent() {
        let registry = Arc::new(ConnectionRegistry::new());

        let (tx, _rx) = channel();
        let guard = Arc::clone(&registry).register("mod1", Role::Moderator, tx);
        let id = guard.id();
        assert_eq!(registry.len(), 1);

        drop(guard);
        assert!(registry.is_empty());

        // Double unregister is harmless
        registry.unregister(id);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn each_moderator_gets_their_own_copy() {
        let registry = Arc::new(ConnectionRegistry::new());

        let (tx1, mut rx1) = channel();
        let (tx2, mut rx2) = channel();
        let (tx3, mut rx3) = channel();

        let _g1 = Arc::clone(&registry).register("mod1", Role::Moderator, tx1);
        let _g2 = Arc::clone(&registry).register("mod2", Role::Moderator, tx2);
        let _g3 = Arc::clone(&registry).register("mod3", Role::Moderator, tx3);

        assert_eq!(registry.broadcast_moderators("event"), 3);

        for rx in [&mut rx1, &mut rx2, &mut rx3] {
            assert_eq!(rx.try_recv().unwrap(), "event");
            assert!(rx.try_recv().is_err());
        }
    }
}
