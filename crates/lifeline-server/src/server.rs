use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use lifeline_core::{CoreError, EventBroadcaster, ResourceKind};
use lifeline_dispatch::{AlertStateMachine, ResourceRegistry};

use crate::config::AppConfig;
use crate::connections::ConnectionRegistry;
use crate::fanout::FanoutRouter;
use crate::{handlers, ws};

/// Shared handles behind every handler and websocket session.
#[derive(Clone)]
pub struct AppState {
    pub alerts: Arc<AlertStateMachine>,
    pub resources: Arc<ResourceRegistry>,
    pub connections: Arc<ConnectionRegistry>,
    pub broadcaster: EventBroadcaster,
    pub default_radius_km: f64,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Self {
        let broadcaster = EventBroadcaster::with_capacity(config.dispatch.event_buffer);
        let resources = ResourceRegistry::new_shared();
        for seed in &config.dispatch.seed_resources {
            resources.insert(seed.clone().into_resource());
        }
        let alerts = Arc::new(AlertStateMachine::new(
            Arc::clone(&resources),
            broadcaster.clone(),
        ));
        Self {
            alerts,
            resources,
            connections: Arc::new(ConnectionRegistry::new()),
            broadcaster,
            default_radius_km: config.dispatch.default_radius_km,
        }
    }

    /// Nearest available ambulance to the alert's coordinate.
    pub fn suggest_resource_for(&self, alert_id: &str) -> Result<String, CoreError> {
        let alert = self.alerts.get(alert_id)?;
        let ranked = self.resources.nearest_available(
            alert.coordinate,
            self.default_radius_km,
            ResourceKind::Ambulance,
        )?;
        ranked
            .first()
            .map(|(resource, _)| resource.id.clone())
            .ok_or_else(|| {
                CoreError::invalid_state(format!(
                    "no available ambulance within {} km of alert {alert_id}",
                    self.default_radius_km
                ))
            })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self::new(&AppConfig::default())
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/alerts", post(handlers::create_alert))
        .route("/alerts/active", get(handlers::active_alerts))
        .route("/alerts/history/{reporter_id}", get(handlers::alert_history))
        .route("/alerts/{id}/assign", post(handlers::assign_alert))
        .route("/alerts/{id}/resolve", post(handlers::resolve_alert))
        .route("/resources", get(handlers::list_resources))
        .route("/resources/nearby", get(handlers::nearby_resources))
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http.request",
                    http.method = %req.method(),
                    http.target = %req.uri(),
                )
            }),
        )
        .with_state(state)
}

pub struct LifelineServer {
    addr: SocketAddr,
    app: Router,
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl ServerBuilder {
    pub fn new() -> Self {
        let config = AppConfig::default();
        Self {
            addr: config.addr(),
            config,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.addr = config.addr();
        self.config = config;
        self
    }

    /// Build the router and start the fan-out task.
    pub fn build(self) -> LifelineServer {
        let state = AppState::new(&self.config);

        let router = FanoutRouter::new(Arc::clone(&state.connections));
        router.spawn(state.broadcaster.subscribe());

        if !state.resources.is_empty() {
            tracing::info!(count = state.resources.len(), "seeded resources");
        }

        LifelineServer {
            addr: self.addr,
            app: build_app(state),
        }
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LifelineServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
