use std::{env, sync::Arc};

use ai_llm_service::LlmServiceProfiles;
use anyhow::{Context, Result};
use api::{AppState, ServiceHealth, SessionLimits};
use contextor::{LlmAnswerComposer, Orchestrator, PipelineConfig, build_resolver};
use product_store::{
    ProductStore, StoreConfig,
    embed::{EmbedderConfig, MultimodalEmbedder},
};
use reranker::{CandidateReranker, HttpCrossEncoder, RerankerConfig};
use tracing::{info, warn};

mod telemetry;

const DEFAULT_API_ADDRESS: &str = "127.0.0.1:8080";
const HEALTH_TIMEOUT_SECS: u64 = 5;

#[tokio::main]
async fn main() -> Result<()> {
    // Optional .env; real environment variables take precedence.
    dotenvy::dotenv().ok();
    telemetry::init().context("failed to install tracing subscriber")?;

    let pipeline = PipelineConfig::from_env().context("invalid pipeline configuration")?;
    info!(?pipeline, "pipeline configuration loaded");

    // --- LLM profiles: bad configuration is fatal, unreachable models are not ---
    let llm = Arc::new(
        LlmServiceProfiles::from_env(Some(HEALTH_TIMEOUT_SECS))
            .context("invalid LLM configuration")?,
    );
    for h in llm.health_all().await {
        if h.ok {
            info!(component = %h.component, model = ?h.model, latency_ms = h.latency_ms, "LLM ready");
        } else {
            warn!(component = %h.component, endpoint = %h.endpoint, message = %h.message, "LLM not ready");
        }
    }

    // --- Embedding server ---
    let embedder = Arc::new(
        MultimodalEmbedder::new(EmbedderConfig::from_env())
            .context("invalid embedding configuration")?,
    );
    embedder
        .health()
        .await
        .with_context(|| format!("embedding server unreachable at {}", embedder.endpoint()))?;
    info!(model = embedder.model(), dim = embedder.dim(), "embedder ready");

    // --- Cross-encoder ---
    let encoder = Arc::new(
        HttpCrossEncoder::new(RerankerConfig::from_env()).context("invalid reranker configuration")?,
    );
    encoder
        .health()
        .await
        .with_context(|| format!("reranker unreachable at {}", encoder.endpoint()))?;
    info!(model = encoder.model(), "reranker ready");

    // --- Vector index ---
    let store_cfg = StoreConfig::from_env().context("invalid Qdrant configuration")?;
    let store = Arc::new(ProductStore::new(store_cfg).context("failed to build Qdrant client")?);
    let status = store.ensure_ready().await.context("product index is not ready")?;
    if status.points == 0 {
        warn!(collection = %status.collection, "collection is empty; searches will return nothing");
    }
    info!(collection = %status.collection, points = status.points, "index ready");

    // --- Pipeline wiring ---
    let resolver = build_resolver(&pipeline, llm.clone());
    let reranker =
        CandidateReranker::new(encoder.clone()).with_max_desc_chars(pipeline.max_desc_chars);
    let composer = Arc::new(
        LlmAnswerComposer::new(llm.clone()).with_max_desc_chars(pipeline.max_desc_chars),
    );
    let orchestrator = Orchestrator::new(
        resolver,
        embedder.clone(),
        store.clone(),
        reranker,
        composer,
        pipeline,
    );

    let health = Arc::new(ServiceHealth::new(llm, embedder, encoder, store));
    let limits = SessionLimits::from_env();
    info!(
        idle_ttl_secs = limits.idle_ttl.as_secs(),
        max_sessions = limits.max_sessions,
        "session limits"
    );
    let state = Arc::new(AppState::with_session_limits(orchestrator, health, limits));

    let addr = env::var("API_ADDRESS").unwrap_or_else(|_| DEFAULT_API_ADDRESS.to_string());
    api::start(&addr, state).await.context("API server failed")?;

    Ok(())
}
