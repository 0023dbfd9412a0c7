pub mod alert;
pub mod error;
pub mod events;
pub mod geo;
pub mod id;
pub mod resource;
pub mod role;

pub use alert::{AlertStatus, EmergencyAlert, Priority};
pub use error::{CoreError, ErrorCategory, Result};
pub use events::{DispatchEvent, EventBroadcaster};
pub use geo::{Coordinate, DEFAULT_RADIUS_KM, distance_km, nearest};
pub use id::generate_id;
pub use resource::{Resource, ResourceKind, ResourceStatus};
pub use role::Role;
