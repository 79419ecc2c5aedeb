//! `DrillServer`: axum router, shared state and the listen loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use drill_services::{Notifier, ScenarioGenerator};
use drill_store::InteractionRepository;

use crate::api;
use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::handler::Broadcaster;
use crate::websocket::registry::ConnectionRegistry;
use crate::websocket::session::run_ws_session;

/// Backends the server talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub repository: Arc<dyn InteractionRepository>,
    pub scenarios: Arc<dyn ScenarioGenerator>,
    pub notifier: Arc<dyn Notifier>,
}

/// Shared state passed to every axum handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub registry: Arc<ConnectionRegistry>,
    pub broadcaster: Arc<Broadcaster>,
    pub repository: Arc<dyn InteractionRepository>,
    pub scenarios: Arc<dyn ScenarioGenerator>,
    pub notifier: Arc<dyn Notifier>,
    pub shutdown: Arc<ShutdownCoordinator>,
    pub start_time: Instant,
    pub metrics: Option<PrometheusHandle>,
}

/// The live session server.
pub struct DrillServer {
    state: AppState,
}

impl DrillServer {
    pub fn new(config: ServerConfig, collaborators: Collaborators) -> Self {
        let registry = Arc::new(ConnectionRegistry::new(config.send_queue_capacity));
        let broadcaster = Arc::new(Broadcaster::new(
            Arc::clone(&registry),
            Arc::clone(&collaborators.repository),
        ));
        Self {
            state: AppState {
                config: Arc::new(config),
                registry,
                broadcaster,
                repository: collaborators.repository,
                scenarios: collaborators.scenarios,
                notifier: collaborators.notifier,
                shutdown: Arc::new(ShutdownCoordinator::new()),
                start_time: Instant::now(),
                metrics: None,
            },
        }
    }

    /// Serve `/metrics` from this recorder handle.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.state.metrics = Some(handle);
        self
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/api/scenarios", post(api::create_scenario))
            .route(
                "/api/simulations/{id}/interactions",
                get(api::list_interactions),
            )
            .route("/api/notifications", post(api::send_notification))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind and serve in a background task.
    ///
    /// Returns the bound address and the serve task, which finishes after
    /// [`shutdown`](Self::shutdown) once every session has been closed.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind(self.state.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        let token = self.state.shutdown.token();
        let registry = Arc::clone(&self.state.registry);

        info!(%addr, "live session server listening");

        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await });
            if let Err(e) = serve.await {
                error!(error = %e, "server error");
            }
            let closed = registry.drain();
            info!(closed, "server stopped");
        });

        Ok((addr, handle))
    }

    /// Stop accepting connections and close every live session.
    pub fn shutdown(&self) {
        self.state.shutdown.shutdown();
    }

    pub fn shutdown_coordinator(&self) -> &Arc<ShutdownCoordinator> {
        &self.state.shutdown
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.state.registry
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    if state.shutdown.is_shutting_down() {
        return (StatusCode::SERVICE_UNAVAILABLE, "server is shutting down").into_response();
    }
    let connections = state.registry.count();
    if connections >= state.config.max_connections {
        warn!(
            connections,
            max = state.config.max_connections,
            "connection limit reached, refusing upgrade"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "connection limit reached").into_response();
    }

    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| async move {
            let (connection, outbound_rx) = state.registry.register();
            run_ws_session(
                socket,
                connection,
                outbound_rx,
                Arc::clone(&state.broadcaster),
                state.shutdown.token(),
            )
            .await;
        })
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.registry.count(),
        state.shutdown.is_shutting_down(),
    ))
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => crate::metrics::render(handle).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use drill_core::notify::EmailMessage;
    use drill_core::scenario::{Scenario, ScenarioRequest};
    use drill_core::{InteractionRecord, NewInteraction};
    use drill_services::{BuiltinScenarioGenerator, DisabledNotifier, ServiceError};
    use drill_store::StoreError;

    use super::*;

    struct FixedRepository(Vec<InteractionRecord>);

    #[async_trait]
    impl InteractionRepository for FixedRepository {
        async fn record_interaction(
            &self,
            _entry: NewInteraction,
        ) -> Result<InteractionRecord, StoreError> {
            Err(StoreError::Database("read-only".into()))
        }

        async fn get_interaction(&self, id: i64) -> Result<InteractionRecord, StoreError> {
            self.0
                .iter()
                .find(|r| r.id == id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("interaction {id}")))
        }

        async fn list_for_simulation(
            &self,
            simulation_id: i64,
        ) -> Result<Vec<InteractionRecord>, StoreError> {
            Ok(self
                .0
                .iter()
                .filter(|r| r.simulation_id == simulation_id)
                .cloned()
                .collect())
        }

        async fn list_for_user(&self, user_id: i64) -> Result<Vec<InteractionRecord>, StoreError> {
            Ok(self.0.iter().filter(|r| r.user_id == user_id).cloned().collect())
        }
    }

    struct AcceptingNotifier;

    #[async_trait]
    impl Notifier for AcceptingNotifier {
        async fn send(&self, message: &EmailMessage) -> Result<(), ServiceError> {
            message.validate()?;
            Ok(())
        }
    }

    struct BrokenGenerator;

    #[async_trait]
    impl ScenarioGenerator for BrokenGenerator {
        fn name(&self) -> &str {
            "broken"
        }

        async fn generate(&self, _request: &ScenarioRequest) -> Result<Scenario, ServiceError> {
            Err(ServiceError::Upstream {
                status: 500,
                body: "overloaded".into(),
            })
        }
    }

    fn record(id: i64, simulation_id: i64) -> InteractionRecord {
        InteractionRecord {
            id,
            user_id: 1,
            simulation_id,
            action: drill_core::InteractionAction::CrisisDecision,
            details: serde_json::json!({"decision": "isolate", "phase": 0}),
            created_at: "2026-10-16T09:00:00+00:00".into(),
        }
    }

    fn server_with(
        scenarios: Arc<dyn ScenarioGenerator>,
        notifier: Arc<dyn Notifier>,
    ) -> DrillServer {
        DrillServer::new(
            ServerConfig::default(),
            Collaborators {
                repository: Arc::new(FixedRepository(vec![record(1, 5), record(2, 6), record(3, 5)])),
                scenarios,
                notifier,
            },
        )
    }

    fn server() -> DrillServer {
        server_with(Arc::new(BuiltinScenarioGenerator), Arc::new(DisabledNotifier))
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let resp = server()
            .router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["connections"], 0);
    }

    #[tokio::test]
    async fn metrics_without_recorder_is_unavailable() {
        let resp = server()
            .router()
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn metrics_renders_with_recorder() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let server = server().with_metrics(recorder.handle());
        let resp = server
            .router()
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ws_route_requires_upgrade() {
        let resp = server()
            .router()
            .oneshot(Request::get("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn create_scenario_with_builtin_generator() {
        let resp = server()
            .router()
            .oneshot(post_json(
                "/api/scenarios",
                r#"{"scenarioType":"ransomware","complexity":"basic"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert!(!json["phases"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_scenario_rejects_bad_body() {
        let resp = server()
            .router()
            .oneshot(post_json("/api/scenarios", r#"{"scenarioType":"alien-invasion"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["kind"], "bad_request");
    }

    #[tokio::test]
    async fn create_scenario_upstream_failure_is_bad_gateway() {
        let resp = server_with(Arc::new(BrokenGenerator), Arc::new(DisabledNotifier))
            .router()
            .oneshot(post_json(
                "/api/scenarios",
                r#"{"scenarioType":"ransomware","complexity":"basic"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn list_interactions_filters_by_simulation() {
        let resp = server()
            .router()
            .oneshot(
                Request::get("/api/simulations/5/interactions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        let ids: Vec<i64> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, [1, 3]);
    }

    #[tokio::test]
    async fn notification_disabled_is_unavailable() {
        let resp = server()
            .router()
            .oneshot(post_json(
                "/api/notifications",
                r#"{"to":"alex@example.com","subject":"Drill","body":"<p>hi</p>"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn notification_delivered() {
        let resp = server_with(Arc::new(BuiltinScenarioGenerator), Arc::new(AcceptingNotifier))
            .router()
            .oneshot(post_json(
                "/api/notifications",
                r#"{"to":"alex@example.com","subject":"Drill","body":"<p>hi</p>"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, serde_json::json!({"delivered": true}));
    }

    #[tokio::test]
    async fn notification_validation_failure_is_bad_request() {
        let resp = server_with(Arc::new(BuiltinScenarioGenerator), Arc::new(AcceptingNotifier))
            .router()
            .oneshot(post_json(
                "/api/notifications",
                r#"{"to":"nobody","subject":"Drill","body":"<p>hi</p>"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn listen_and_shutdown() {
        let server = server();
        let (addr, handle) = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);
        server.shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
