//! Role- and ownership-scoped event fan-out.
//!
//! Consumes dispatch events from the broadcaster and delivers them to the
//! matching subset of live sessions. Targeting is expressed through the
//! named predicates on [`ConnectionRegistry`] (`handles_by_role`,
//! `handles_for`) composed per event type, not inlined conditionals.
//! Delivery is deliver-or-drop: one immediate retry, then the recipient is
//! skipped so no slow session ever blocks the others.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use lifeline_core::{DispatchEvent, Role};

use crate::connections::{ConnectionId, ConnectionRegistry, SessionHandle};
use crate::protocol::ServerMessage;

pub struct FanoutRouter {
    connections: Arc<ConnectionRegistry>,
}

impl FanoutRouter {
    pub fn new(connections: Arc<ConnectionRegistry>) -> Self {
        Self { connections }
    }

    /// Consume events from `receiver` until the bus closes.
    pub fn spawn(self, mut receiver: broadcast::Receiver<DispatchEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => self.dispatch(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Best-effort channel: slow consumption drops events
                        tracing::warn!(skipped, "fanout lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            tracing::debug!("fanout router stopped");
        })
    }

    /// Route one event to its recipients.
    pub fn dispatch(&self, event: &DispatchEvent) {
        let (targets, message) = match event {
            DispatchEvent::AlertCreated { alert } => (
                self.connections.handles_by_role(Role::ResponseTeam),
                ServerMessage::AlertUpdate {
                    alert: alert.clone(),
                },
            ),
            DispatchEvent::AlertUpdated { alert } => {
                // Response team plus every session of the reporting user,
                // deduplicated by connection id
                let mut seen: HashSet<ConnectionId> = HashSet::new();
                let mut targets = Vec::new();
                for (id, handle) in self
                    .connections
                    .handles_by_role(Role::ResponseTeam)
                    .into_iter()
                    .chain(self.connections.handles_for(&alert.reporter_id))
                {
                    if seen.insert(id.clone()) {
                        targets.push((id, handle));
                    }
                }
                (
                    targets,
                    ServerMessage::AlertUpdate {
                        alert: alert.clone(),
                    },
                )
            }
            DispatchEvent::LocationUpdate {
                resource_id,
                coordinate,
                origin_role,
                origin_connection,
            } => {
                // Peer visibility among response-team sessions only; the
                // originating connection already holds the fix
                if *origin_role != Role::ResponseTeam {
                    return;
                }
                let targets = self
                    .connections
                    .handles_by_role(Role::ResponseTeam)
                    .into_iter()
                    .filter(|(id, _)| Some(id.as_str()) != origin_connection.as_deref())
                    .collect();
                (
                    targets,
                    ServerMessage::LocationUpdate {
                        resource_id: resource_id.clone(),
                        coordinate: *coordinate,
                    },
                )
            }
        };

        let mut delivered = 0usize;
        for (connection_id, handle) in &targets {
            if self.deliver(connection_id, handle, message.clone()) {
                delivered += 1;
            }
        }
        tracing::debug!(
            event = event.name(),
            targets = targets.len(),
            delivered,
            "event fanned out"
        );
    }

    /// Push to one session: at most one immediate retry, then drop.
    fn deliver(&self, connection_id: &str, handle: &SessionHandle, message: ServerMessage) -> bool {
        use tokio::sync::mpsc::error::TrySendError;

        match handle.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Closed(_)) => {
                // Session is mid-disconnect; a normal, silent skip
                tracing::debug!(connection_id, "skipping closed session");
                false
            }
            Err(TrySendError::Full(message)) => match handle.try_send(message) {
                Ok(()) => true,
                Err(_) => {
                    tracing::warn!(
                        connection_id,
                        "transport unavailable, dropping delivery"
                    );
                    false
                }
            },
        }
    }
}
