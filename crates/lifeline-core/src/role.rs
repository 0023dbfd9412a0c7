use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Role attached to a live session; drives fan-out targeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The person who raised (or may raise) an alert
    Victim,
    /// On-duty rescuer receiving every alert broadcast
    ResponseTeam,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Victim => "victim",
            Role::ResponseTeam => "response_team",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "victim" => Ok(Role::Victim),
            "response_team" => Ok(Role::ResponseTeam),
            "admin" => Ok(Role::Admin),
            other => Err(CoreError::validation(format!("unknown role '{other}'"))),
        }
    }
}
