//! GET /health: dependency readiness.

use std::sync::Arc;

use ai_llm_service::HealthStatus;
use axum::{extract::State, http::StatusCode, response::Response};
use serde::Serialize;
use tracing::warn;

use crate::core::{app_state::AppState, http::response_envelope::ApiResponse};

#[derive(Debug, Serialize)]
pub struct HealthReport {
    /// `ok` when every component is reachable, else `degraded`.
    pub status: &'static str,
    pub sessions: usize,
    pub components: Vec<HealthStatus>,
}

/// Handler: GET /health
///
/// Responds 503 when any component is down; the body lists all of them.
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let components = state.health.check().await;
    let all_ok = components.iter().all(|c| c.ok);

    if !all_ok {
        for c in components.iter().filter(|c| !c.ok) {
            warn!(component = %c.component, endpoint = %c.endpoint, message = %c.message, "unhealthy");
        }
    }

    let report = HealthReport {
        status: if all_ok { "ok" } else { "degraded" },
        sessions: state.sessions.len().await,
        components,
    };
    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    ApiResponse::success(report).into_response_with_status(status)
}
