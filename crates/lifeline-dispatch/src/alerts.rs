//! Alert lifecycle state machine.
//!
//! Owns every `EmergencyAlert` and is the only code that mutates one.
//! Each successful mutation publishes exactly one event on the
//! broadcaster; side effects are observable only through those events and
//! subsequent reads. Fan-out is decoupled from the mutation, so a slow or
//! unreachable listener can never stall a transition.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use time::OffsetDateTime;

use lifeline_core::geo::Coordinate;
use lifeline_core::{
    AlertStatus, CoreError, DispatchEvent, EmergencyAlert, EventBroadcaster, Priority, Result,
    generate_id,
};

use crate::resources::ResourceRegistry;

/// State machine for the emergency-alert lifecycle.
pub struct AlertStateMachine {
    alerts: RwLock<HashMap<String, EmergencyAlert>>,
    resources: Arc<ResourceRegistry>,
    broadcaster: EventBroadcaster,
}

impl AlertStateMachine {
    pub fn new(resources: Arc<ResourceRegistry>, broadcaster: EventBroadcaster) -> Self {
        Self {
            alerts: RwLock::new(HashMap::new()),
            resources,
            broadcaster,
        }
    }

    pub fn new_shared(resources: Arc<ResourceRegistry>, broadcaster: EventBroadcaster) -> Arc<Self> {
        Arc::new(Self::new(resources, broadcaster))
    }

    /// Raise a new alert. Emits `AlertCreated`.
    pub fn create(
        &self,
        reporter_id: impl Into<String>,
        coordinate: Coordinate,
        description: impl Into<String>,
        priority: Priority,
    ) -> Result<EmergencyAlert> {
        let reporter_id = reporter_id.into();
        let description = description.into();

        coordinate.validate()?;
        if description.trim().is_empty() {
            return Err(CoreError::validation("description must not be empty"));
        }
        if reporter_id.trim().is_empty() {
            return Err(CoreError::validation("reporter_id must not be empty"));
        }

        let alert = EmergencyAlert {
            id: generate_id(),
            reporter_id,
            coordinate,
            description,
            priority,
            status: AlertStatus::Active,
            assigned_resource_id: None,
            created_at: OffsetDateTime::now_utc(),
            resolved_at: None,
        };

        {
            let mut alerts = self.alerts.write();
            alerts.insert(alert.id.clone(), alert.clone());
        }

        tracing::info!(
            alert_id = %alert.id,
            reporter_id = %alert.reporter_id,
            priority = %alert.priority,
            "alert created"
        );
        self.broadcaster.send(DispatchEvent::alert_created(alert.clone()));
        Ok(alert)
    }

    /// Confirm an active alert and commit a resource to it, atomically.
    ///
    /// Delegates to [`ResourceRegistry::assign`] while holding the alert
    /// write lock; if the resource assignment fails the alert is left
    /// unchanged (no partial state). Emits `AlertUpdated` on success.
    pub fn confirm_and_assign(&self, alert_id: &str, resource_id: &str) -> Result<EmergencyAlert> {
        let updated = {
            let mut alerts = self.alerts.write();
            let alert = alerts
                .get_mut(alert_id)
                .ok_or_else(|| CoreError::not_found("alert", alert_id))?;

            if !alert.status.can_transition_to(AlertStatus::InProgress) {
                return Err(CoreError::invalid_transition(
                    alert.status.to_string(),
                    AlertStatus::InProgress.to_string(),
                ));
            }

            // Resource commit first; on failure the alert stays untouched.
            self.resources.assign(resource_id, alert_id)?;

            alert.status = AlertStatus::InProgress;
            alert.assigned_resource_id = Some(resource_id.to_string());
            alert.clone()
        };

        tracing::info!(alert_id, resource_id, "alert confirmed and assigned");
        self.broadcaster.send(DispatchEvent::alert_updated(updated.clone()));
        Ok(updated)
    }

    /// Close out an alert, freeing its resource if one was assigned.
    /// Emits `AlertUpdated`.
    pub fn resolve(&self, alert_id: &str) -> Result<EmergencyAlert> {
        let updated = {
            let mut alerts = self.alerts.write();
            let alert = alerts
                .get_mut(alert_id)
                .ok_or_else(|| CoreError::not_found("alert", alert_id))?;

            if !alert.status.can_transition_to(AlertStatus::Resolved) {
                return Err(CoreError::invalid_transition(
                    alert.status.to_string(),
                    AlertStatus::Resolved.to_string(),
                ));
            }

            alert.status = AlertStatus::Resolved;
            alert.resolved_at = Some(OffsetDateTime::now_utc());

            if let Some(resource_id) = alert.assigned_resource_id.clone()
                && let Err(e) = self.resources.release(&resource_id)
            {
                // Resolution stands even if the resource vanished
                tracing::warn!(
                    alert_id,
                    resource_id = %resource_id,
                    error = %e,
                    "failed to release resource on resolve"
                );
            }

            alert.clone()
        };

        tracing::info!(alert_id, "alert resolved");
        self.broadcaster.send(DispatchEvent::alert_updated(updated.clone()));
        Ok(updated)
    }

    pub fn get(&self, alert_id: &str) -> Result<EmergencyAlert> {
        let alerts = self.alerts.read();
        alerts
            .get(alert_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("alert", alert_id))
    }

    /// Unconfirmed alerts, most recent first. An alert leaves this feed
    /// the moment a resource is committed to it.
    pub fn get_active(&self) -> Vec<EmergencyAlert> {
        let alerts = self.alerts.read();
        let mut active: Vec<EmergencyAlert> = alerts
            .values()
            .filter(|a| a.status == AlertStatus::Active)
            .cloned()
            .collect();
        sort_newest_first(&mut active);
        active
    }

    /// Every alert a reporter ever raised, most recent first.
    pub fn history(&self, reporter_id: &str) -> Vec<EmergencyAlert> {
        let alerts = self.alerts.read();
        let mut history: Vec<EmergencyAlert> = alerts
            .values()
            .filter(|a| a.reporter_id == reporter_id)
            .cloned()
            .collect();
        sort_newest_first(&mut history);
        history
    }

    pub fn len(&self) -> usize {
        self.alerts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.read().is_empty()
    }
}

// created_at descending, id as deterministic tie-break
fn sort_newest_first(alerts: &mut [EmergencyAlert]) {
    alerts.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

impl std::fmt::Debug for AlertStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertStateMachine")
            .field("alerts", &self.len())
            .finish()
    }
}
