//! POST /sessions/{id}/turns: runs one conversational turn.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::Response,
};
use tracing::{debug, info, instrument};

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse, sessions::validate_session_id},
    error_handler::AppResult,
    routes::turns::{turn_request::TurnRequest, turn_response::TurnResponse},
};

/// Handler: POST /sessions/{id}/turns
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8080/sessions/demo/turns \
///   -H 'content-type: application/json' \
///   -d '{"text":"Busco laptops","top_k":3}'
/// ```
#[instrument(skip_all, fields(session = %session_id))]
pub async fn post_turn(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    payload: Result<Json<TurnRequest>, JsonRejection>,
) -> AppResult<Response> {
    validate_session_id(&session_id)?;
    let Json(body) = payload?;
    let input = body.into_input(state.orchestrator.config().max_top_k)?;
    debug!(
        has_text = input.raw_text().is_some(),
        has_image = input.image().is_some(),
        "post_turn: start"
    );

    let session = state.sessions.get_or_create(&session_id).await;
    let outcome = {
        let mut conversation = session.lock().await;
        state.orchestrator.run_turn(&mut conversation, input).await
    };

    info!(
        intent = ?outcome.query.intent,
        products = outcome.products.len(),
        degraded = !outcome.degradations.is_empty(),
        "post_turn: done"
    );

    let body = TurnResponse::from_outcome(session_id, outcome);
    Ok(ApiResponse::success(body).into_response_with_status(StatusCode::OK))
}
