//! HTTP surface of the shopping assistant.
//!
//! | Method | Path                   | Purpose                              |
//! |--------|------------------------|--------------------------------------|
//! | POST   | `/sessions/{id}/turns` | run one turn (text and/or image)     |
//! | GET    | `/sessions/{id}/turns` | ordered history of a session         |
//! | DELETE | `/sessions/{id}`       | drop a session                       |
//! | GET    | `/health`              | LLM, embedder, reranker, index state |

pub mod core;
pub mod error_handler;
mod routes;

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get},
};
use tokio::signal;
use tracing::{debug, error, info};

pub use crate::core::{
    app_state::{AppState, HealthProbe, ServiceHealth},
    sessions::{SessionLimits, SessionRegistry},
};
pub use error_handler::{AppError, AppResult};

use crate::routes::{
    health_route::health,
    sessions::session_route::{delete_session, list_turns},
    turns::turn_route::post_turn,
};

/// Request bodies carry base64 images.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Upper bound on the idle-session sweep period.
const MAX_SWEEP_PERIOD: Duration = Duration::from_secs(60);

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sessions/{id}/turns", get(list_turns).post(post_turn))
        .route("/sessions/{id}", delete(delete_session))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Binds `addr` and serves until Ctrl+C.
pub async fn start(addr: &str, state: Arc<AppState>) -> AppResult<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| AppError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    info!(%addr, "listening");

    let sweeper = tokio::spawn(sweep_sessions(state.clone()));

    // Start server with graceful shutdown on Ctrl+C
    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server);
    sweeper.abort();
    served?;

    info!("server stopped");
    Ok(())
}

/// Periodically drops idle sessions.
async fn sweep_sessions(state: Arc<AppState>) {
    let period = state
        .sessions
        .limits()
        .idle_ttl
        .clamp(Duration::from_secs(1), MAX_SWEEP_PERIOD);
    let mut tick = tokio::time::interval(period);
    loop {
        tick.tick().await;
        let dropped = state.sessions.sweep_idle().await;
        if dropped > 0 {
            debug!(dropped, "idle sessions expired");
        }
    }
}

/// Resolves when Ctrl+C is pressed.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
