//! Per-session WebSocket event channel.
//!
//! One lightweight task per live connection. Inbound frames are parsed and
//! validated before any shared state is touched; a message that fails
//! validation gets an `error` acknowledgment on this session only and
//! never corrupts the registries. Outbound pushes (fan-out and direct
//! acks) flow through the session's mpsc channel so ordering is uniform.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use lifeline_core::{generate_id, CoreError, DispatchEvent, Role};

use crate::connections::{Session, SessionHandle};
use crate::protocol::{AlertAction, ClientMessage, ServerMessage};
use crate::server::AppState;

/// Outbound queue per session; beyond this, fan-out starts dropping.
const OUTBOUND_BUFFER: usize = 32;

/// Identity attached to a session once `authenticate` has been accepted.
#[derive(Debug, Clone)]
struct AuthInfo {
    identity: String,
    role: Role,
}

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_session(socket, state))
}

/// Drive one connection until it closes, then drop it from the registry.
async fn handle_session(socket: WebSocket, state: AppState) {
    let connection_id = generate_id();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(OUTBOUND_BUFFER);
    let handle = SessionHandle::new(tx);
    let (mut sink, mut stream) = socket.split();
    let mut auth: Option<AuthInfo> = None;

    tracing::debug!(connection_id = %connection_id, "websocket connected");

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                match outbound {
                    Some(message) => {
                        let text = match serde_json::to_string(&message) {
                            Ok(text) => text,
                            Err(e) => {
                                tracing::error!(error = %e, "failed to encode push");
                                continue;
                            }
                        };
                        if sink.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) =
                            process_message(&state, &connection_id, &handle, &mut auth, &text)
                        {
                            // Ack goes only to the originating session
                            if let Err(e) = handle.try_send(reply) {
                                tracing::debug!(
                                    connection_id = %connection_id,
                                    error = %e,
                                    "dropping direct reply"
                                );
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sink.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(connection_id = %connection_id, error = %e, "websocket error");
                        break;
                    }
                }
            }
        }
    }

    // Removal must land before any further event considers this session
    state.connections.unregister(&connection_id);
    tracing::debug!(connection_id = %connection_id, "websocket disconnected");
}

/// Handle one inbound frame; returns the direct reply, if any.
fn process_message(
    state: &AppState,
    connection_id: &str,
    handle: &SessionHandle,
    auth: &mut Option<AuthInfo>,
    text: &str,
) -> Option<ServerMessage> {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            return Some(ServerMessage::Error {
                message: format!("malformed message: {e}"),
            });
        }
    };

    match apply_message(state, connection_id, handle, auth, message) {
        Ok(reply) => reply,
        Err(e) => {
            tracing::debug!(
                connection_id,
                category = %e.category(),
                error = %e,
                "rejected inbound message"
            );
            Some(ServerMessage::Error {
                message: e.to_string(),
            })
        }
    }
}

fn apply_message(
    state: &AppState,
    connection_id: &str,
    handle: &SessionHandle,
    auth: &mut Option<AuthInfo>,
    message: ClientMessage,
) -> Result<Option<ServerMessage>, CoreError> {
    match message {
        ClientMessage::Authenticate { identity, role } => {
            if identity.trim().is_empty() {
                return Err(CoreError::validation("identity must not be empty"));
            }
            let role: Role = role.parse()?;
            state.connections.register(Session {
                connection_id: connection_id.to_string(),
                identity: identity.clone(),
                role,
                last_coordinate: None,
                handle: handle.clone(),
            });
            *auth = Some(AuthInfo { identity, role });
            Ok(Some(ServerMessage::Authenticated {
                connection_id: connection_id.to_string(),
            }))
        }
        ClientMessage::NewAlert {
            coordinate,
            description,
            priority,
        } => {
            let auth = require_auth(auth)?;
            let alert = state
                .alerts
                .create(auth.identity.clone(), coordinate, description, priority)?;
            // The reporter gets one authoritative push; the response team
            // hears about it through fan-out
            Ok(Some(ServerMessage::AlertUpdate { alert }))
        }
        ClientMessage::AlertUpdate {
            id,
            action,
            resource_id,
        } => {
            let auth = require_auth(auth)?;
            if auth.role == Role::Victim {
                return Err(CoreError::validation(
                    "victim sessions cannot drive the alert lifecycle",
                ));
            }
            match action {
                AlertAction::Assign => {
                    let resource_id = match resource_id {
                        Some(resource_id) => resource_id,
                        None => state.suggest_resource_for(&id)?,
                    };
                    state.alerts.confirm_and_assign(&id, &resource_id)?;
                }
                AlertAction::Resolve => {
                    state.alerts.resolve(&id)?;
                }
            }
            Ok(None)
        }
        ClientMessage::LocationUpdate {
            resource_id,
            coordinate,
        } => {
            let auth = require_auth(auth)?;
            if auth.role != Role::ResponseTeam {
                return Err(CoreError::validation(
                    "only response_team sessions report resource locations",
                ));
            }
            state.resources.update_location(&resource_id, coordinate)?;
            state.connections.update_location(connection_id, coordinate);
            state.broadcaster.send(DispatchEvent::location_update(
                resource_id,
                coordinate,
                auth.role,
                Some(connection_id.to_string()),
            ));
            Ok(None)
        }
    }
}

fn require_auth(auth: &Option<AuthInfo>) -> Result<&AuthInfo, CoreError> {
    auth.as_ref()
        .ok_or_else(|| CoreError::validation("session is not authenticated"))
}
