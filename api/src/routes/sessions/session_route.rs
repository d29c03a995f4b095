//! Session history and removal.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use contextor::Turn;
use serde::Serialize;
use tracing::debug;

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse, sessions::validate_session_id},
    error_handler::{AppError, AppResult},
};

#[derive(Debug, Serialize)]
pub struct SessionHistory {
    pub session_id: String,
    pub turns: Vec<Turn>,
}

/// Handler: GET /sessions/{id}/turns
pub async fn list_turns(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> AppResult<Response> {
    validate_session_id(&session_id)?;
    let session = state
        .sessions
        .get(&session_id)
        .await
        .ok_or_else(|| AppError::SessionNotFound(session_id.clone()))?;

    let turns = session.lock().await.turns().to_vec();
    debug!(session = %session_id, turns = turns.len(), "list_turns");

    let body = SessionHistory { session_id, turns };
    Ok(ApiResponse::success(body).into_response_with_status(StatusCode::OK))
}

/// Handler: DELETE /sessions/{id}
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> AppResult<Response> {
    validate_session_id(&session_id)?;
    if !state.sessions.remove(&session_id).await {
        return Err(AppError::SessionNotFound(session_id));
    }
    debug!(session = %session_id, "session dropped");
    Ok(StatusCode::NO_CONTENT.into_response())
}
