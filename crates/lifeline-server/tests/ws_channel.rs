use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use lifeline_core::geo::Coordinate;
use lifeline_core::{Resource, ResourceKind};
use lifeline_server::{build_app, AppConfig, AppState, FanoutRouter};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> (String, AppState, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    let state = AppState::new(&AppConfig::default());
    state.resources.insert(Resource::new(
        "amb-1",
        "Unit 1",
        ResourceKind::Ambulance,
        Some(Coordinate::new(37.7849, -122.4194)),
    ));
    FanoutRouter::new(Arc::clone(&state.connections)).spawn(state.broadcaster.subscribe());
    let app = build_app(state.clone());

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

    (format!("ws://{addr}/ws"), state, tx, server)
}

async fn connect(url: &str) -> WsClient {
    let (ws, _) = connect_async(url).await.expect("connect");
    ws
}

async fn send_json(ws: &mut WsClient, value: Value) {
    ws.send(Message::Text(value.to_string()))
        .await
        .expect("send");
}

async fn recv_json(ws: &mut WsClient) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for push")
            .expect("stream ended")
            .expect("websocket error");
        if msg.is_text() {
            return serde_json::from_str(msg.to_text().unwrap()).expect("valid json");
        }
    }
}

async fn authenticate(ws: &mut WsClient, identity: &str, role: &str) -> String {
    send_json(
        ws,
        json!({ "type": "authenticate", "identity": identity, "role": role }),
    )
    .await;
    let ack = recv_json(ws).await;
    assert_eq!(ack["type"], "authenticated", "unexpected ack: {ack}");
    ack["connection_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn chest_pain_scenario_fans_out_by_role() {
    let (url, _state, shutdown_tx, handle) = start_server().await;

    let mut rescuer = connect(&url).await;
    authenticate(&mut rescuer, "rescuer-1", "response_team").await;

    let mut victim = connect(&url).await;
    authenticate(&mut victim, "user-1", "victim").await;

    // Victim reports; they get the ack, the response team gets the push
    send_json(
        &mut victim,
        json!({
            "type": "new_alert",
            "coordinate": { "lat": 37.7749, "lng": -122.4194 },
            "description": "chest pain, conscious",
            "priority": "high",
        }),
    )
    .await;

    let ack = recv_json(&mut victim).await;
    assert_eq!(ack["type"], "alert_update");
    assert_eq!(ack["alert"]["status"], "active");
    let alert_id = ack["alert"]["id"].as_str().unwrap().to_string();

    let push = recv_json(&mut rescuer).await;
    assert_eq!(push["type"], "alert_update");
    assert_eq!(push["alert"]["id"], alert_id.as_str());
    assert_eq!(push["alert"]["reporter_id"], "user-1");

    // The team confirms; both sides see the assignment
    send_json(
        &mut rescuer,
        json!({ "type": "alert_update", "id": alert_id, "action": "assign" }),
    )
    .await;

    let push = recv_json(&mut rescuer).await;
    assert_eq!(push["alert"]["status"], "in_progress");
    assert_eq!(push["alert"]["assigned_resource_id"], "amb-1");
    let push = recv_json(&mut victim).await;
    assert_eq!(push["alert"]["status"], "in_progress");

    // Resolution reaches both as well
    send_json(
        &mut rescuer,
        json!({ "type": "alert_update", "id": alert_id, "action": "resolve" }),
    )
    .await;
    let push = recv_json(&mut rescuer).await;
    assert_eq!(push["alert"]["status"], "resolved");
    let push = recv_json(&mut victim).await;
    assert_eq!(push["alert"]["status"], "resolved");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn location_updates_reach_peers_but_not_the_origin() {
    let (url, state, shutdown_tx, handle) = start_server().await;

    let mut mover = connect(&url).await;
    authenticate(&mut mover, "rescuer-1", "response_team").await;
    let mut peer = connect(&url).await;
    authenticate(&mut peer, "rescuer-2", "response_team").await;
    let mut victim = connect(&url).await;
    authenticate(&mut victim, "user-1", "victim").await;

    send_json(
        &mut mover,
        json!({
            "type": "location_update",
            "resource_id": "amb-1",
            "coordinate": { "lat": 37.79, "lng": -122.41 },
        }),
    )
    .await;

    // Only the other response-team session hears about it
    let push = recv_json(&mut peer).await;
    assert_eq!(push["type"], "location_update");
    assert_eq!(push["resource_id"], "amb-1");
    assert_eq!(push["coordinate"]["lat"], 37.79);

    // The registry tracked the new fix
    assert_eq!(
        state.resources.get("amb-1").unwrap().coordinate,
        Some(Coordinate::new(37.79, -122.41))
    );

    // Neither the origin nor the victim received anything; a follow-up
    // round-trip on the mover's socket would have surfaced a stray push
    send_json(
        &mut mover,
        json!({ "type": "location_update", "resource_id": "amb-1",
                "coordinate": { "lat": 37.80, "lng": -122.41 } }),
    )
    .await;
    let push = recv_json(&mut peer).await;
    assert_eq!(push["coordinate"]["lat"], 37.80);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn victim_sessions_cannot_drive_the_lifecycle() {
    let (url, state, shutdown_tx, handle) = start_server().await;

    let mut victim = connect(&url).await;
    authenticate(&mut victim, "user-1", "victim").await;

    let alert = state
        .alerts
        .create(
            "user-1",
            Coordinate::new(37.7749, -122.4194),
            "chest pain",
            lifeline_core::Priority::High,
        )
        .unwrap();
    // Creation pushes only to the response team, so the victim's next
    // frame must be the error ack
    send_json(
        &mut victim,
        json!({ "type": "alert_update", "id": alert.id, "action": "resolve" }),
    )
    .await;
    let reply = recv_json(&mut victim).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(
        state.alerts.get(&alert.id).unwrap().status,
        lifeline_core::AlertStatus::Active
    );

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}
