//! Prometheus metrics recorder and metric names.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the handle used to render `/metrics`. Call once at startup.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Active WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// WebSocket connection lifetime (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Accepted decision events (counter).
pub const DECISIONS_RECEIVED_TOTAL: &str = "decisions_received_total";
/// Decision updates enqueued to peers (counter).
pub const DECISION_RELAYS_TOTAL: &str = "decision_relays_total";
/// Relays dropped because a peer queue was full or closed (counter, labels: reason).
pub const RELAY_DROPS_TOTAL: &str = "relay_drops_total";
/// Inbound frames rejected as malformed (counter, labels: reason).
pub const MALFORMED_MESSAGES_TOTAL: &str = "malformed_messages_total";
/// Interaction records that failed to persist (counter).
pub const INTERACTION_PERSIST_FAILURES_TOTAL: &str = "interaction_persist_failures_total";
