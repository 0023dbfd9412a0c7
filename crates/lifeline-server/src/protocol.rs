//! Wire protocol for the per-session event channel.
//!
//! The channel carries no persisted state: on reconnect a session
//! re-authenticates and re-subscribes, and there is no message replay.

use serde::{Deserialize, Serialize};

use lifeline_core::geo::Coordinate;
use lifeline_core::{EmergencyAlert, Priority};

/// Messages a client sends over the event channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// First message of every session; everything else is rejected until
    /// it arrives
    Authenticate { identity: String, role: String },
    /// Raise an alert (equivalent to `POST /alerts` for the session identity)
    NewAlert {
        coordinate: Coordinate,
        description: String,
        priority: Priority,
    },
    /// Drive an alert's lifecycle
    AlertUpdate {
        id: String,
        action: AlertAction,
        resource_id: Option<String>,
    },
    /// Report a resource position fix
    LocationUpdate {
        resource_id: String,
        coordinate: Coordinate,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertAction {
    Assign,
    Resolve,
}

/// Messages pushed to a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Authenticated { connection_id: String },
    /// Carries both newly created and updated alerts
    AlertUpdate { alert: EmergencyAlert },
    LocationUpdate {
        resource_id: String,
        coordinate: Coordinate,
    },
    /// Error acknowledgment, delivered only to the originating session
    Error { message: String },
}
