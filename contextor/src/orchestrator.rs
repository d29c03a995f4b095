//! Per-turn retrieval and rerank state machine.
//!
//! ```text
//! INIT -> CONTEXT_RESOLVED -> INTENT_CLASSIFIED -> RETRIEVED -> RERANKED -> COMPLETE
//!                                              \-> REUSED_PRIOR ---------/
//! ```
//!
//! Every external call is bounded by a timeout. Failures never escape a turn:
//! they shrink or unrank the result set and are recorded as [`Degradation`]s.

use std::{sync::Arc, time::Duration};

use product_store::{Candidate, SimilarityIndex, embed::EmbeddingProvider};
use reranker::{CandidateReranker, RankedResult};
use serde::Serialize;
use tracing::{Span, debug, info, instrument, warn};

use crate::{
    cfg::PipelineConfig,
    composer::{AnswerComposer, AnswerRequest, FALLBACK_ANSWER},
    conversation::{ConversationState, Turn},
    query::{Intent, Query, TurnInput},
    report::RankingReport,
    resolver::ContextResolver,
};

/// States a turn passes through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnStage {
    Init,
    ContextResolved,
    IntentClassified,
    Retrieved,
    Reranked,
    ReusedPrior,
    Complete,
}

/// A non-fatal stage failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", content = "message", rename_all = "snake_case")]
pub enum Degradation {
    Resolution(String),
    Intent(String),
    Embedding(String),
    Index(String),
    Rerank(String),
    Composition(String),
}

/// Everything produced by one turn.
#[derive(Clone, Debug, Serialize)]
pub struct TurnOutcome {
    pub query: Query,
    pub products: Vec<RankedResult>,
    pub answer: String,
    pub report: Option<RankingReport>,
    pub stages: Vec<TurnStage>,
    pub degradations: Vec<Degradation>,
}

/// Capabilities the orchestrator is wired with.
#[derive(Clone)]
pub struct Orchestrator {
    resolver: ContextResolver,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn SimilarityIndex>,
    reranker: CandidateReranker,
    composer: Arc<dyn AnswerComposer>,
    cfg: PipelineConfig,
}

impl Orchestrator {
    pub fn new(
        resolver: ContextResolver,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn SimilarityIndex>,
        reranker: CandidateReranker,
        composer: Arc<dyn AnswerComposer>,
        cfg: PipelineConfig,
    ) -> Self {
        Self {
            resolver,
            embedder,
            index,
            reranker,
            composer,
            cfg,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    /// Runs one turn against `state`, appending the user and assistant turns.
    #[instrument(skip_all, fields(intent = tracing::field::Empty, has_image = input.image().is_some()))]
    pub async fn run_turn(&self, state: &mut ConversationState, input: TurnInput) -> TurnOutcome {
        let mut stages = vec![TurnStage::Init];
        let mut degradations = Vec::new();

        let raw_text = input.raw_text().unwrap_or_default().to_string();
        let image = input.image();
        let has_image = image.is_some();
        let top_k = input
            .top_k()
            .unwrap_or(self.cfg.top_k)
            .clamp(1, self.cfg.max_top_k.max(1));

        // CONTEXT_RESOLVED
        let resolved = self.resolver.resolve(&raw_text, state.turns(), has_image).await;
        if let Some(e) = resolved.fallback {
            degradations.push(Degradation::Resolution(e.to_string()));
        }
        let effective = resolved.value;
        stages.push(TurnStage::ContextResolved);

        // INTENT_CLASSIFIED
        let intent = self.resolver.classify(&effective, state.turns(), has_image).await;
        if let Some(e) = intent.fallback {
            degradations.push(Degradation::Intent(e.to_string()));
        }
        let intent = intent.value;
        Span::current().record("intent", tracing::field::debug(intent));
        stages.push(TurnStage::IntentClassified);

        let query = Query {
            resolved_text: (effective != raw_text).then(|| effective.clone()),
            raw_text: raw_text.clone(),
            intent,
            image_reference: image.map(|i| i.reference.clone()),
        };

        let (products, report) = match intent {
            Intent::Details => {
                stages.push(TurnStage::ReusedPrior);
                debug!(reused = state.last_products().len(), "reusing prior results");
                (state.last_products().to_vec(), None)
            }
            Intent::Search => {
                let candidates = self
                    .retrieve(&input, &effective, top_k, &mut degradations)
                    .await;
                stages.push(TurnStage::Retrieved);

                let products = self
                    .rank(&effective, candidates, top_k, &mut degradations)
                    .await;
                stages.push(TurnStage::Reranked);

                state.replace_last_products(products.clone());
                let report = RankingReport::from_results(&products);
                (products, report)
            }
        };

        let history = self.answer_history(state, &raw_text, has_image);
        let answer = self
            .compose(&query, &products, &history, &mut degradations)
            .await;

        let shown = match intent {
            Intent::Search => products.clone(),
            Intent::Details => Vec::new(),
        };
        state.push(
            Turn::user(
                (!raw_text.is_empty()).then(|| raw_text.clone()),
                query.image_reference.clone(),
            )
            .with_resolved(query.resolved_text.clone()),
        );
        state.push(Turn::assistant(answer.clone(), shown, report.clone()));
        stages.push(TurnStage::Complete);

        info!(
            effective_query = %query.effective_text(),
            products = products.len(),
            degradations = degradations.len(),
            "turn completed"
        );

        TurnOutcome {
            query,
            products,
            answer,
            report,
            stages,
            degradations,
        }
    }

    /// Embedding then index query; any failure yields no candidates.
    async fn retrieve(
        &self,
        input: &TurnInput,
        effective: &str,
        top_k: usize,
        degradations: &mut Vec<Degradation>,
    ) -> Vec<Candidate> {
        let embedding = match input.image() {
            Some(img) => {
                bounded(self.cfg.embed_timeout, self.embedder.embed_image(&img.bytes)).await
            }
            None => bounded(self.cfg.embed_timeout, self.embedder.embed_text(effective)).await,
        };
        let vector = match embedding {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "embedding failed; continuing without candidates");
                degradations.push(Degradation::Embedding(e));
                return Vec::new();
            }
        };

        let fetch_k = self.cfg.fetch_k(top_k);
        match bounded(self.cfg.index_timeout, self.index.query(&vector, fetch_k)).await {
            Ok(c) => {
                debug!(fetch_k, hits = c.len(), "candidates retrieved");
                c
            }
            Err(e) => {
                warn!(error = %e, "index query failed; continuing without candidates");
                degradations.push(Degradation::Index(e));
                Vec::new()
            }
        }
    }

    /// Reranks candidates; on failure keeps similarity order cut to `top_k`.
    async fn rank(
        &self,
        effective: &str,
        candidates: Vec<Candidate>,
        top_k: usize,
        degradations: &mut Vec<Degradation>,
    ) -> Vec<RankedResult> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let rerank_query = if effective.trim().is_empty() {
            self.cfg.visual_rerank_phrase.as_str()
        } else {
            effective
        };

        let attempt = bounded(
            self.cfg.rerank_timeout,
            self.reranker.rerank(rerank_query, candidates.clone(), top_k),
        )
        .await;

        match attempt {
            Ok(ranked) => ranked,
            Err(e) => {
                warn!(error = %e, "rerank failed; keeping similarity order");
                degradations.push(Degradation::Rerank(e));
                candidates
                    .into_iter()
                    .take(top_k)
                    .map(RankedResult::unranked)
                    .collect()
            }
        }
    }

    async fn compose(
        &self,
        query: &Query,
        products: &[RankedResult],
        history: &[String],
        degradations: &mut Vec<Degradation>,
    ) -> String {
        let req = AnswerRequest {
            effective_query: query.effective_text(),
            intent: query.intent,
            products,
            history,
        };
        match bounded(self.cfg.llm_timeout, self.composer.compose(req)).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "answer composition failed; using fallback text");
                degradations.push(Degradation::Composition(e));
                FALLBACK_ANSWER.to_string()
            }
        }
    }

    /// Last `answer_history_window` prior turns plus the current utterance.
    fn answer_history(&self, state: &ConversationState, raw: &str, has_image: bool) -> Vec<String> {
        let mut lines: Vec<String> = state
            .recent(self.cfg.answer_history_window)
            .iter()
            .map(Turn::as_prompt_line)
            .collect();
        let current = Turn::user(
            (!raw.is_empty()).then(|| raw.to_string()),
            has_image.then(String::new),
        );
        lines.push(current.as_prompt_line());
        lines
    }
}

/// Awaits `fut` for at most `limit`, flattening timeout and error to a message.
async fn bounded<T, E, F>(limit: Duration, fut: F) -> Result<T, String>
where
    F: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("timed out after {} ms", limit.as_millis())),
    }
}
