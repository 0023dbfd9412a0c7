use std::sync::Arc;

use serde_json::{json, Value};
use tokio::task::JoinHandle;

use lifeline_core::geo::Coordinate;
use lifeline_core::{Resource, ResourceKind};
use lifeline_server::{build_app, AppConfig, AppState, FanoutRouter};

/// Downtown San Francisco; the seeded units sit at known distances from it.
const ORIGIN: (f64, f64) = (37.7749, -122.4194);

fn seeded_state() -> AppState {
    let state = AppState::new(&AppConfig::default());
    // ~1.1 km north
    state.resources.insert(Resource::new(
        "amb-1",
        "Unit 1",
        ResourceKind::Ambulance,
        Some(Coordinate::new(37.7849, -122.4194)),
    ));
    // ~6.7 km north
    state.resources.insert(Resource::new(
        "amb-2",
        "Unit 2",
        ResourceKind::Ambulance,
        Some(Coordinate::new(37.8349, -122.4194)),
    ));
    // ~55 km north, outside the 10 km default radius
    state.resources.insert(Resource::new(
        "amb-far",
        "Far Unit",
        ResourceKind::Ambulance,
        Some(Coordinate::new(38.27, -122.4194)),
    ));
    state
}

async fn start_server(
    state: AppState,
) -> (String, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    FanoutRouter::new(Arc::clone(&state.connections)).spawn(state.broadcaster.subscribe());
    let app = build_app(state);

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    (format!("http://{addr}"), tx, server)
}

#[tokio::test]
async fn alert_lifecycle_over_http() {
    let (base, shutdown_tx, handle) = start_server(seeded_state()).await;
    let client = reqwest::Client::new();

    // Report a chest-pain emergency downtown
    let resp = client
        .post(format!("{base}/alerts"))
        .json(&json!({
            "reporter_id": "user-1",
            "coordinate": { "lat": ORIGIN.0, "lng": ORIGIN.1 },
            "description": "chest pain, conscious",
            "priority": "high",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let alert: Value = resp.json().await.unwrap();
    assert_eq!(alert["status"], "active");
    let alert_id = alert["id"].as_str().unwrap().to_string();

    // Unconfirmed alert shows up in the active feed
    let resp = client
        .get(format!("{base}/alerts/active"))
        .send()
        .await
        .unwrap();
    let active: Value = resp.json().await.unwrap();
    assert_eq!(active.as_array().unwrap().len(), 1);

    // Assign without naming a resource: the nearest available unit wins
    let resp = client
        .post(format!("{base}/alerts/{alert_id}/assign"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let assigned: Value = resp.json().await.unwrap();
    assert_eq!(assigned["status"], "in_progress");
    assert_eq!(assigned["assigned_resource_id"], "amb-1");

    // The unit is committed now
    let resp = client.get(format!("{base}/resources")).send().await.unwrap();
    let resources: Value = resp.json().await.unwrap();
    let amb1 = resources
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["id"] == "amb-1")
        .unwrap();
    assert_eq!(amb1["status"], "dispatched");
    assert_eq!(amb1["assigned_alert_id"], alert_id.as_str());

    // Once a unit is committed the alert is no longer awaiting dispatch
    let resp = client
        .get(format!("{base}/alerts/active"))
        .send()
        .await
        .unwrap();
    let active: Value = resp.json().await.unwrap();
    assert!(active.as_array().unwrap().is_empty());

    // Resolve releases the unit and closes the alert
    let resp = client
        .post(format!("{base}/alerts/{alert_id}/resolve"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let resolved: Value = resp.json().await.unwrap();
    assert_eq!(resolved["status"], "resolved");
    assert!(resolved["resolved_at"].is_string());

    let resp = client
        .get(format!("{base}/alerts/active"))
        .send()
        .await
        .unwrap();
    let active: Value = resp.json().await.unwrap();
    assert!(active.as_array().unwrap().is_empty());

    let resp = client
        .get(format!("{base}/alerts/history/user-1"))
        .send()
        .await
        .unwrap();
    let history: Value = resp.json().await.unwrap();
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["status"], "resolved");

    let resp = client.get(format!("{base}/resources")).send().await.unwrap();
    let resources: Value = resp.json().await.unwrap();
    let amb1 = resources
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["id"] == "amb-1")
        .unwrap();
    assert_eq!(amb1["status"], "available");
    assert!(amb1["assigned_alert_id"].is_null());

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn nearby_query_orders_and_bounds_results() {
    let (base, shutdown_tx, handle) = start_server(seeded_state()).await;
    let client = reqwest::Client::new();

    // Default 10 km radius excludes the far unit
    let resp = client
        .get(format!(
            "{base}/resources/nearby?lat={}&lng={}",
            ORIGIN.0, ORIGIN.1
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let ranked: Value = resp.json().await.unwrap();
    let ids: Vec<&str> = ranked
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["amb-1", "amb-2"]);
    assert!(ranked[0]["distance_km"].as_f64().unwrap() < ranked[1]["distance_km"].as_f64().unwrap());

    // A wider radius includes it, still sorted by distance
    let resp = client
        .get(format!(
            "{base}/resources/nearby?lat={}&lng={}&radius_km=100",
            ORIGIN.0, ORIGIN.1
        ))
        .send()
        .await
        .unwrap();
    let ranked: Value = resp.json().await.unwrap();
    let ids: Vec<&str> = ranked
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["amb-1", "amb-2", "amb-far"]);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn invalid_requests_map_to_problem_responses() {
    let (base, shutdown_tx, handle) = start_server(seeded_state()).await;
    let client = reqwest::Client::new();

    // Empty description -> 400
    let resp = client
        .post(format!("{base}/alerts"))
        .json(&json!({
            "reporter_id": "user-1",
            "coordinate": { "lat": ORIGIN.0, "lng": ORIGIN.1 },
            "description": "",
            "priority": "high",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "bad_request");

    // Unknown alert -> 404
    let resp = client
        .post(format!("{base}/alerts/missing/resolve"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // Resolving twice -> 409 conflict on the terminal state
    let resp = client
        .post(format!("{base}/alerts"))
        .json(&json!({
            "reporter_id": "user-1",
            "coordinate": { "lat": ORIGIN.0, "lng": ORIGIN.1 },
            "description": "minor injury",
            "priority": "low",
        }))
        .send()
        .await
        .unwrap();
    let alert: Value = resp.json().await.unwrap();
    let alert_id = alert["id"].as_str().unwrap();

    let resp = client
        .post(format!("{base}/alerts/{alert_id}/resolve"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let resp = client
        .post(format!("{base}/alerts/{alert_id}/resolve"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}
