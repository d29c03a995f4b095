use std::{sync::Arc, time::Instant};

use ai_llm_service::{HealthStatus, LlmServiceProfiles};
use contextor::Orchestrator;
use futures::future::BoxFuture;
use product_store::{ProductStore, embed::MultimodalEmbedder};
use reranker::HttpCrossEncoder;

use crate::core::sessions::{SessionLimits, SessionRegistry};

/// Readiness of every external dependency.
pub trait HealthProbe: Send + Sync {
    fn check(&self) -> BoxFuture<'_, Vec<HealthStatus>>;
}

/// Shared state for all HTTP handlers.
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub sessions: SessionRegistry,
    pub health: Arc<dyn HealthProbe>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, health: Arc<dyn HealthProbe>) -> Self {
        Self::with_session_limits(orchestrator, health, SessionLimits::default())
    }

    pub fn with_session_limits(
        orchestrator: Orchestrator,
        health: Arc<dyn HealthProbe>,
        limits: SessionLimits,
    ) -> Self {
        Self {
            orchestrator,
            sessions: SessionRegistry::with_limits(limits),
            health,
        }
    }
}

/// Probes the live LLM profiles, embedder, cross-encoder and index.
pub struct ServiceHealth {
    llm: Arc<LlmServiceProfiles>,
    embedder: Arc<MultimodalEmbedder>,
    reranker: Arc<HttpCrossEncoder>,
    store: Arc<ProductStore>,
}

impl ServiceHealth {
    pub fn new(
        llm: Arc<LlmServiceProfiles>,
        embedder: Arc<MultimodalEmbedder>,
        reranker: Arc<HttpCrossEncoder>,
        store: Arc<ProductStore>,
    ) -> Self {
        Self {
            llm,
            embedder,
            reranker,
            store,
        }
    }
}

impl HealthProbe for ServiceHealth {
    fn check(&self) -> BoxFuture<'_, Vec<HealthStatus>> {
        Box::pin(async move {
            let mut out = self.llm.health_all().await;

            let started = Instant::now();
            let res = self.embedder.health().await;
            out.push(status(
                "embedding",
                self.embedder.endpoint(),
                Some(self.embedder.model()),
                started,
                res.map(|()| format!("dim {}", self.embedder.dim())),
            ));

            let started = Instant::now();
            let res = self.reranker.health().await;
            out.push(status(
                "reranker",
                self.reranker.endpoint(),
                Some(self.reranker.model()),
                started,
                res.map(|()| "ready".to_string()),
            ));

            let started = Instant::now();
            let cfg = self.store.config();
            let res = self.store.ensure_ready().await;
            out.push(status(
                "index",
                &cfg.qdrant_url,
                Some(&cfg.collection),
                started,
                res.map(|s| format!("{} points", s.points)),
            ));

            out
        })
    }
}

fn status<E: std::fmt::Display>(
    component: &str,
    endpoint: &str,
    model: Option<&str>,
    started: Instant,
    res: Result<String, E>,
) -> HealthStatus {
    let latency = started.elapsed().as_millis();
    match res {
        Ok(msg) => HealthStatus::ok(component, endpoint, model, latency, msg),
        Err(e) => HealthStatus::fail(component, endpoint, model, latency, e.to_string()),
    }
}
