//! Rescue resources: ambulance units and medical facilities.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::geo::Coordinate;

/// Kind of rescue resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Mobile ambulance unit
    Ambulance,
    /// Fixed medical facility (hospital, clinic)
    Facility,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Ambulance => "ambulance",
            ResourceKind::Facility => "facility",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ambulance" => Ok(ResourceKind::Ambulance),
            "facility" => Ok(ResourceKind::Facility),
            other => Err(CoreError::validation(format!(
                "unknown resource kind '{other}'"
            ))),
        }
    }
}

/// Operational status of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// Free to be assigned to an alert
    Available,
    /// Committed to an alert and en route
    Dispatched,
    /// On scene / occupied by an alert
    InUse,
    /// Out of service
    Maintenance,
}

impl ResourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceStatus::Available => "available",
            ResourceStatus::Dispatched => "dispatched",
            ResourceStatus::InUse => "in_use",
            ResourceStatus::Maintenance => "maintenance",
        }
    }

    /// Statuses that carry an alert assignment.
    pub fn is_committed(&self) -> bool {
        matches!(self, ResourceStatus::Dispatched | ResourceStatus::InUse)
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ResourceStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(ResourceStatus::Available),
            "dispatched" => Ok(ResourceStatus::Dispatched),
            "in_use" => Ok(ResourceStatus::InUse),
            "maintenance" => Ok(ResourceStatus::Maintenance),
            other => Err(CoreError::validation(format!(
                "unknown resource status '{other}'"
            ))),
        }
    }
}

/// A rescue resource that can be matched to an emergency alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub name: String,
    pub kind: ResourceKind,
    /// Last known position; a resource without one is never a match candidate
    pub coordinate: Option<Coordinate>,
    pub status: ResourceStatus,
    /// Id of the alert this resource is committed to, if any
    pub assigned_alert_id: Option<String>,
}

impl Resource {
    /// Create a new available resource.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: ResourceKind,
        coordinate: Option<Coordinate>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            coordinate,
            status: ResourceStatus::Available,
            assigned_alert_id: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == ResourceStatus::Available
    }

    /// Status/assignment consistency: available implies unassigned,
    /// dispatched or in_use implies assigned.
    pub fn invariant_ok(&self) -> bool {
        match self.status {
            ResourceStatus::Available => self.assigned_alert_id.is_none(),
            ResourceStatus::Dispatched | ResourceStatus::InUse => self.assigned_alert_id.is_some(),
            ResourceStatus::Maintenance => true,
        }
    }
}
