//! REST handlers for the alert lifecycle and resource queries.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use lifeline_core::geo::Coordinate;
use lifeline_core::{EmergencyAlert, Priority, Resource, ResourceKind};

use crate::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateAlertRequest {
    pub reporter_id: String,
    pub coordinate: Coordinate,
    pub description: String,
    pub priority: Priority,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssignRequest {
    /// When absent the server picks the nearest available ambulance.
    #[serde(default)]
    pub resource_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub radius_km: Option<f64>,
    #[serde(default)]
    pub kind: Option<ResourceKind>,
}

#[derive(Debug, Serialize)]
pub struct NearbyResource {
    #[serde(flatten)]
    pub resource: Resource,
    pub distance_km: f64,
}

pub async fn root() -> impl IntoResponse {
    let body = json!({
        "service": "Lifeline Dispatch Server",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

pub async fn create_alert(
    State(state): State<AppState>,
    Json(req): Json<CreateAlertRequest>,
) -> Result<(StatusCode, Json<EmergencyAlert>), ApiError> {
    let alert = state
        .alerts
        .create(req.reporter_id, req.coordinate, req.description, req.priority)?;
    Ok((StatusCode::CREATED, Json(alert)))
}

pub async fn assign_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AssignRequest>,
) -> Result<Json<EmergencyAlert>, ApiError> {
    let resource_id = match req.resource_id {
        Some(resource_id) => resource_id,
        None => state.suggest_resource_for(&id)?,
    };
    let alert = state.alerts.confirm_and_assign(&id, &resource_id)?;
    Ok(Json(alert))
}

pub async fn resolve_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EmergencyAlert>, ApiError> {
    let alert = state.alerts.resolve(&id)?;
    Ok(Json(alert))
}

pub async fn active_alerts(State(state): State<AppState>) -> Json<Vec<EmergencyAlert>> {
    Json(state.alerts.get_active())
}

pub async fn alert_history(
    State(state): State<AppState>,
    Path(reporter_id): Path<String>,
) -> Json<Vec<EmergencyAlert>> {
    Json(state.alerts.history(&reporter_id))
}

pub async fn list_resources(State(state): State<AppState>) -> Json<Vec<Resource>> {
    Json(state.resources.list())
}

pub async fn nearby_resources(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<Vec<NearbyResource>>, ApiError> {
    let origin = Coordinate::new(query.lat, query.lng);
    let radius_km = query.radius_km.unwrap_or(state.default_radius_km);
    let kind = query.kind.unwrap_or(ResourceKind::Ambulance);
    let ranked = state.resources.find_nearby(origin, radius_km, kind)?;
    Ok(Json(
        ranked
            .into_iter()
            .map(|(resource, distance_km)| NearbyResource {
                resource,
                distance_km,
            })
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifeline_core::{AlertStatus, ResourceStatus};

    fn seeded_state() -> AppState {
        let state = AppState::for_tests();
        state.resources.insert(Resource::new(
            "amb-1",
            "Unit 1",
            ResourceKind::Ambulance,
            Some(Coordinate::new(37.7849, -122.4194)),
        ));
        state.resources.insert(Resource::new(
            "amb-2",
            "Unit 2",
            ResourceKind::Ambulance,
            Some(Coordinate::new(37.8349, -122.4194)),
        ));
        state
    }

    #[tokio::test]
    async fn test_create_then_assign_then_resolve() {
        let state = seeded_state();

        let (status, Json(alert)) = create_alert(
            State(state.clone()),
            Json(CreateAlertRequest {
                reporter_id: "user-1".into(),
                coordinate: Coordinate::new(37.7749, -122.4194),
                description: "chest pain".into(),
                priority: Priority::High,
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(alert.status, AlertStatus::Active);

        let Json(assigned) = assign_alert(
            State(state.clone()),
            Path(alert.id.clone()),
            Json(AssignRequest {
                resource_id: Some("amb-1".into()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(assigned.status, AlertStatus::InProgress);
        assert_eq!(assigned.assigned_resource_id.as_deref(), Some("amb-1"));

        let Json(resolved) = resolve_alert(State(state.clone()), Path(alert.id.clone()))
            .await
            .unwrap();
        assert_eq!(resolved.status, AlertStatus::Resolved);
        assert!(resolved.resolved_at.is_some());
        assert_eq!(
            state.resources.get("amb-1").unwrap().status,
            ResourceStatus::Available
        );
    }

    #[tokio::test]
    async fn test_assign_without_body_resource_picks_nearest() {
        let state = seeded_state();
        let alert = state
            .alerts
            .create(
                "user-1",
                Coordinate::new(37.7749, -122.4194),
                "chest pain",
                Priority::High,
            )
            .unwrap();

        let Json(assigned) = assign_alert(
            State(state.clone()),
            Path(alert.id.clone()),
            Json(AssignRequest::default()),
        )
        .await
        .unwrap();
        assert_eq!(assigned.assigned_resource_id.as_deref(), Some("amb-1"));
    }

    #[tokio::test]
    async fn test_resolve_unknown_alert_is_not_found() {
        let state = seeded_state();
        let err = resolve_alert(State(state), Path("missing".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_nearby_defaults_to_configured_radius() {
        let state = seeded_state();
        // ~55 km north, outside the 10 km default
        state.resources.insert(Resource::new(
            "amb-far",
            "Far Unit",
            ResourceKind::Ambulance,
            Some(Coordinate::new(38.27, -122.4194)),
        ));

        let Json(ranked) = nearby_resources(
            State(state),
            Query(NearbyQuery {
                lat: 37.7749,
                lng: -122.4194,
                radius_km: None,
                kind: None,
            }),
        )
        .await
        .unwrap();

        let ids: Vec<&str> = ranked.iter().map(|r| r.resource.id.as_str()).collect();
        assert_eq!(ids, vec!["amb-1", "amb-2"]);
        assert!(ranked[0].distance_km < ranked[1].distance_km);
    }
}
