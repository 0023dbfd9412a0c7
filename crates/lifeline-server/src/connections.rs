//! Registry of live, authenticated sessions.
//!
//! Three indices (by connection, by identity, by role) are kept in sync
//! under one lock, so a disconnect removes a session from all of them in a
//! single critical section. A broadcast that snapshotted handles before
//! the removal treats the closed channel as a normal, silent skip.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use tokio::sync::mpsc;

use lifeline_core::Role;
use lifeline_core::geo::Coordinate;

use crate::protocol::ServerMessage;

pub type ConnectionId = String;

/// Handle for pushing messages to a connected session.
#[derive(Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<ServerMessage>,
}

impl SessionHandle {
    pub fn new(sender: mpsc::Sender<ServerMessage>) -> Self {
        Self { sender }
    }

    /// Non-blocking push; the caller decides what a failure means.
    pub fn try_send(
        &self,
        message: ServerMessage,
    ) -> Result<(), mpsc::error::TrySendError<ServerMessage>> {
        self.sender.try_send(message)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// One live, authenticated connection.
#[derive(Clone)]
pub struct Session {
    pub connection_id: ConnectionId,
    pub identity: String,
    pub role: Role,
    /// Last coordinate the session reported, if any
    pub last_coordinate: Option<Coordinate>,
    pub handle: SessionHandle,
}

#[derive(Default)]
struct Indices {
    sessions: HashMap<ConnectionId, Session>,
    by_identity: HashMap<String, HashSet<ConnectionId>>,
    by_role: HashMap<Role, HashSet<ConnectionId>>,
}

/// Registry of currently connected sessions.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: RwLock<Indices>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session to every index.
    pub fn register(&self, session: Session) {
        let mut inner = self.inner.write();

        // Re-authentication replaces the session wholesale; the previous
        // identity/role index entries must not linger
        if let Some(old) = inner.sessions.remove(&session.connection_id) {
            remove_from_index(&mut inner.by_identity, &old.identity, &old.connection_id);
            remove_from_index(&mut inner.by_role, &old.role, &old.connection_id);
        }

        inner
            .by_identity
            .entry(session.identity.clone())
            .or_default()
            .insert(session.connection_id.clone());
        inner
            .by_role
            .entry(session.role)
            .or_default()
            .insert(session.connection_id.clone());

        tracing::debug!(
            connection_id = %session.connection_id,
            identity = %session.identity,
            role = %session.role,
            "session registered"
        );
        inner
            .sessions
            .insert(session.connection_id.clone(), session);
    }

    /// Remove a session from every index. Idempotent.
    pub fn unregister(&self, connection_id: &str) {
        let mut inner = self.inner.write();
        let Some(session) = inner.sessions.remove(connection_id) else {
            return;
        };

        remove_from_index(&mut inner.by_identity, &session.identity, connection_id);
        remove_from_index(&mut inner.by_role, &session.role, connection_id);

        tracing::debug!(connection_id, "session unregistered");
    }

    /// Connection ids of every session held by an identity (a user may be
    /// connected from several devices at once).
    pub fn sessions_for(&self, identity: &str) -> HashSet<ConnectionId> {
        let inner = self.inner.read();
        inner.by_identity.get(identity).cloned().unwrap_or_default()
    }

    /// Connection ids of every session with the given role.
    pub fn sessions_by_role(&self, role: Role) -> HashSet<ConnectionId> {
        let inner = self.inner.read();
        inner.by_role.get(&role).cloned().unwrap_or_default()
    }

    pub fn session(&self, connection_id: &str) -> Option<Session> {
        let inner = self.inner.read();
        inner.sessions.get(connection_id).cloned()
    }

    /// Delivery handles for all sessions with the given role.
    pub fn handles_by_role(&self, role: Role) -> Vec<(ConnectionId, SessionHandle)> {
        let inner = self.inner.read();
        inner
            .by_role
            .get(&role)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| {
                        inner
                            .sessions
                            .get(id)
                            .map(|s| (id.clone(), s.handle.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Delivery handles for all sessions held by an identity.
    pub fn handles_for(&self, identity: &str) -> Vec<(ConnectionId, SessionHandle)> {
        let inner = self.inner.read();
        inner
            .by_identity
            .get(identity)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| {
                        inner
                            .sessions
                            .get(id)
                            .map(|s| (id.clone(), s.handle.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Record the last coordinate a session reported.
    pub fn update_location(&self, connection_id: &str, coordinate: Coordinate) {
        let mut inner = self.inner.write();
        if let Some(session) = inner.sessions.get_mut(connection_id) {
            session.last_coordinate = Some(coordinate);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().sessions.is_empty()
    }
}

// Drop a connection id from a secondary index, pruning emptied buckets.
fn remove_from_index<K: std::hash::Hash + Eq>(
    index: &mut HashMap<K, HashSet<ConnectionId>>,
    key: &K,
    connection_id: &str,
) {
    if let Some(ids) = index.get_mut(key) {
        ids.remove(connection_id);
        if ids.is_empty() {
            index.remove(key);
        }
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("sessions", &self.len())
            .finish()
    }
}
