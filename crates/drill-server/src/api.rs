//! JSON endpoints around the live session: scenarios, interaction history, mail.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use drill_core::notify::EmailMessage;
use drill_core::scenario::{Scenario, ScenarioRequest};
use drill_core::InteractionRecord;
use drill_services::ServiceError;
use drill_store::StoreError;

use crate::server::AppState;

/// Error body for every `/api` route: `{"error": "...", "kind": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Service(ServiceError::Validation(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Service(ServiceError::Disabled(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Service(_) => StatusCode::BAD_GATEWAY,
            Self::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Service(e) => e.kind(),
            Self::Store(_) => "storage",
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(status = status.as_u16(), kind = self.kind(), error = %self, "api request failed");
        }
        (status, Json(json!({ "error": self.to_string(), "kind": self.kind() }))).into_response()
    }
}

/// `POST /api/scenarios`
pub async fn create_scenario(
    State(state): State<AppState>,
    payload: Result<Json<ScenarioRequest>, JsonRejection>,
) -> Result<Json<Scenario>, ApiError> {
    let Json(request) = payload?;
    let scenario = state.scenarios.generate(&request).await?;
    info!(
        generator = state.scenarios.name(),
        scenario_type = request.scenario_type.label(),
        complexity = request.complexity.as_str(),
        phases = scenario.phases.len(),
        "scenario generated"
    );
    Ok(Json(scenario))
}

/// `GET /api/simulations/{id}/interactions`
pub async fn list_interactions(
    State(state): State<AppState>,
    Path(simulation_id): Path<i64>,
) -> Result<Json<Vec<InteractionRecord>>, ApiError> {
    let records = state.repository.list_for_simulation(simulation_id).await?;
    Ok(Json(records))
}

/// `POST /api/notifications`
pub async fn send_notification(
    State(state): State<AppState>,
    payload: Result<Json<EmailMessage>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(message) = payload?;
    state.notifier.send(&message).await?;
    Ok(Json(json!({ "delivered": true })))
}
