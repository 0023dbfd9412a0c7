//! Event types emitted by the dispatch engine.

use serde::{Deserialize, Serialize};

use crate::alert::EmergencyAlert;
use crate::geo::Coordinate;
use crate::role::Role;

/// Event flowing from the registries to the fan-out router.
///
/// Every mutation of an alert or a resource position is observable as
/// exactly one event on the bus; nothing is mutated silently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchEvent {
    /// A reporter raised a new alert
    AlertCreated { alert: EmergencyAlert },
    /// An alert changed status or assignment
    AlertUpdated { alert: EmergencyAlert },
    /// A resource (or the session tracking it) moved
    LocationUpdate {
        resource_id: String,
        coordinate: Coordinate,
        origin_role: Role,
        /// Connection that produced the update, so fan-out can skip
        /// echoing it back
        origin_connection: Option<String>,
    },
}

impl DispatchEvent {
    pub fn alert_created(alert: EmergencyAlert) -> Self {
        DispatchEvent::AlertCreated { alert }
    }

    pub fn alert_updated(alert: EmergencyAlert) -> Self {
        DispatchEvent::AlertUpdated { alert }
    }

    pub fn location_update(
        resource_id: impl Into<String>,
        coordinate: Coordinate,
        origin_role: Role,
        origin_connection: Option<String>,
    ) -> Self {
        DispatchEvent::LocationUpdate {
            resource_id: resource_id.into(),
            coordinate,
            origin_role,
            origin_connection,
        }
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            DispatchEvent::AlertCreated { .. } => "alert_created",
            DispatchEvent::AlertUpdated { .. } => "alert_updated",
            DispatchEvent::LocationUpdate { .. } => "location_update",
        }
    }

    /// The alert carried by this event, if any.
    pub fn as_alert(&self) -> Option<&EmergencyAlert> {
        match self {
            DispatchEvent::AlertCreated { alert } | DispatchEvent::AlertUpdated { alert } => {
                Some(alert)
            }
            DispatchEvent::LocationUpdate { .. } => None,
        }
    }
}
