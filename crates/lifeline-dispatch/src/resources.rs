//! In-memory registry of rescue resources.
//!
//! Mutations take the write lock, so assignment is a single atomic state
//! transition (at-most-one-assignment under concurrent callers). Read
//! paths clone a snapshot under the read lock; staleness of at most one
//! in-flight mutation is acceptable there.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use lifeline_core::geo::{self, Coordinate};
use lifeline_core::{CoreError, Resource, ResourceKind, ResourceStatus, Result};

/// Registry owning the live status of ambulances and facilities.
#[derive(Default)]
pub struct ResourceRegistry {
    resources: RwLock<HashMap<String, Resource>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Provisioning path: add or replace a resource (seed/admin operation).
    pub fn insert(&self, resource: Resource) {
        let mut map = self.resources.write();
        map.insert(resource.id.clone(), resource);
    }

    pub fn get(&self, resource_id: &str) -> Result<Resource> {
        let map = self.resources.read();
        map.get(resource_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("resource", resource_id))
    }

    /// Snapshot of every registered resource.
    pub fn list(&self) -> Vec<Resource> {
        let map = self.resources.read();
        let mut all: Vec<Resource> = map.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Resources of the given kind currently free for assignment.
    pub fn list_available(&self, kind: ResourceKind) -> Vec<Resource> {
        let map = self.resources.read();
        let mut available: Vec<Resource> = map
            .values()
            .filter(|r| r.kind == kind && r.is_available())
            .cloned()
            .collect();
        available.sort_by(|a, b| a.id.cmp(&b.id));
        available
    }

    /// Rank resources of `kind` by proximity to `origin`, any status.
    pub fn find_nearby(
        &self,
        origin: Coordinate,
        radius_km: f64,
        kind: ResourceKind,
    ) -> Result<Vec<(Resource, f64)>> {
        let candidates = self.snapshot_of_kind(kind);
        geo::nearest(origin, &candidates, radius_km, None)
    }

    /// Rank only `available` resources of `kind`, for assignment suggestions.
    pub fn nearest_available(
        &self,
        origin: Coordinate,
        radius_km: f64,
        kind: ResourceKind,
    ) -> Result<Vec<(Resource, f64)>> {
        let candidates = self.snapshot_of_kind(kind);
        geo::nearest(
            origin,
            &candidates,
            radius_km,
            Some(ResourceStatus::Available),
        )
    }

    /// Commit an available resource to an alert.
    ///
    /// Single write-lock critical section: concurrent `assign` calls for
    /// the same resource cannot both succeed.
    pub fn assign(&self, resource_id: &str, alert_id: &str) -> Result<Resource> {
        let mut map = self.resources.write();
        let resource = map
            .get_mut(resource_id)
            .ok_or_else(|| CoreError::not_found("resource", resource_id))?;

        if !resource.is_available() {
            return Err(CoreError::invalid_state(format!(
                "resource {resource_id} is {}, not available",
                resource.status
            )));
        }

        resource.status = ResourceStatus::Dispatched;
        resource.assigned_alert_id = Some(alert_id.to_string());
        debug_assert!(resource.invariant_ok());

        tracing::info!(resource_id, alert_id, "resource dispatched");
        Ok(resource.clone())
    }

    /// Free a resource. Idempotent: releasing an already-available
    /// resource is a no-op success.
    pub fn release(&self, resource_id: &str) -> Result<Resource> {
        let mut map = self.resources.write();
        let resource = map
            .get_mut(resource_id)
            .ok_or_else(|| CoreError::not_found("resource", resource_id))?;

        if resource.is_available() {
            return Ok(resource.clone());
        }

        resource.status = ResourceStatus::Available;
        resource.assigned_alert_id = None;
        debug_assert!(resource.invariant_ok());

        tracing::info!(resource_id, "resource released");
        Ok(resource.clone())
    }

    /// Update a resource's last known position.
    pub fn update_location(&self, resource_id: &str, coordinate: Coordinate) -> Result<()> {
        coordinate.validate()?;
        let mut map = self.resources.write();
        let resource = map
            .get_mut(resource_id)
            .ok_or_else(|| CoreError::not_found("resource", resource_id))?;
        resource.coordinate = Some(coordinate);
        Ok(())
    }

    /// Admin/maintenance status change.
    ///
    /// Moving to `available` clears any assignment; moving directly to a
    /// committed status without an assignment is rejected, that path goes
    /// through [`assign`](Self::assign).
    pub fn update_status(&self, resource_id: &str, status: ResourceStatus) -> Result<Resource> {
        let mut map = self.resources.write();
        let resource = map
            .get_mut(resource_id)
            .ok_or_else(|| CoreError::not_found("resource", resource_id))?;

        if status.is_committed() && resource.assigned_alert_id.is_none() {
            return Err(CoreError::invalid_state(format!(
                "resource {resource_id} cannot be {status} without an assigned alert"
            )));
        }

        resource.status = status;
        if status == ResourceStatus::Available {
            resource.assigned_alert_id = None;
        }
        debug_assert!(resource.invariant_ok());

        tracing::info!(resource_id, status = %status, "resource status updated");
        Ok(resource.clone())
    }

    pub fn len(&self) -> usize {
        self.resources.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.read().is_empty()
    }

    fn snapshot_of_kind(&self, kind: ResourceKind) -> Vec<Resource> {
        let map = self.resources.read();
        map.values().filter(|r| r.kind == kind).cloned().collect()
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("resources", &self.len())
            .finish()
    }
}
