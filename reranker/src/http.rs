//! HTTP cross-encoder client.
//!
//! Speaks the text-embeddings-inference `/rerank` API:
//!
//! ```text
//! POST {url}/rerank  {"query": "...", "texts": [...], "raw_scores": true, "truncate": true}
//! ```
//!
//! Two response shapes are accepted:
//!
//! | Shape | Example |
//! |-------|---------|
//! | TEI | `[{"index": 1, "score": 3.2}, ...]` |
//! | Cohere/Jina style | `{"results": [{"index": 1, "relevance_score": 3.2}]}` |
//!
//! Results arrive sorted by relevance; they are mapped back to input order
//! before being returned.

use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::{error::RerankError, traits::CrossEncoder};

/// Reranker server settings.
#[derive(Clone, Debug)]
pub struct RerankerConfig {
    /// Base URL, e.g. `http://127.0.0.1:8081`.
    pub url: String,
    /// Informational; the server decides which model it runs.
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl RerankerConfig {
    /// Reads `RERANKER_URL`, `RERANKER_MODEL` and `RERANKER_API_KEY`.
    pub fn from_env() -> Self {
        let var = |k: &str| std::env::var(k).ok().filter(|v| !v.trim().is_empty());
        Self {
            url: var("RERANKER_URL").unwrap_or_else(|| "http://127.0.0.1:8081".into()),
            model: var("RERANKER_MODEL")
                .unwrap_or_else(|| "cross-encoder/ms-marco-MiniLM-L-6-v2".into()),
            api_key: var("RERANKER_API_KEY"),
            timeout_secs: 30,
        }
    }
}

/// Cross-encoder served over HTTP.
#[derive(Clone, Debug)]
pub struct HttpCrossEncoder {
    client: reqwest::Client,
    config: RerankerConfig,
    url_rerank: String,
    url_health: String,
}

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: &'a [String],
    raw_scores: bool,
    truncate: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RerankResponse {
    Tei(Vec<TeiItem>),
    Results { results: Vec<ResultItem> },
}

#[derive(Debug, Deserialize)]
struct TeiItem {
    index: usize,
    score: f32,
}

#[derive(Debug, Deserialize)]
struct ResultItem {
    index: usize,
    relevance_score: f32,
}

impl HttpCrossEncoder {
    /// # Errors
    /// `Config` for a bad URL or API key, `Transport` if the client cannot be built.
    pub fn new(config: RerankerConfig) -> Result<Self, RerankError> {
        let base = config.url.trim().trim_end_matches('/').to_string();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(RerankError::Config(format!(
                "RERANKER_URL must start with http:// or https://, got '{}'",
                config.url
            )));
        }

        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs.max(1)));
        if let Some(key) = &config.api_key {
            let mut headers = reqwest::header::HeaderMap::new();
            let value = reqwest::header::HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| RerankError::Config(format!("invalid API key header: {e}")))?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
            builder = builder.default_headers(headers);
        }

        info!(url = %base, model = %config.model, "HttpCrossEncoder initialized");

        Ok(Self {
            client: builder.build()?,
            url_rerank: format!("{base}/rerank"),
            url_health: format!("{base}/health"),
            config,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn endpoint(&self) -> &str {
        &self.config.url
    }

    /// Probes `GET {url}/health`.
    pub async fn health(&self) -> Result<(), RerankError> {
        let resp = self.client.get(&self.url_health).send().await?;
        if !resp.status().is_success() {
            return Err(http_error(resp, &self.url_health).await);
        }
        Ok(())
    }

    #[instrument(skip_all, fields(model = %self.config.model, docs = documents.len()))]
    async fn score_batch(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, RerankError> {
        let started = Instant::now();
        let body = RerankRequest {
            query,
            texts: documents,
            raw_scores: true,
            truncate: true,
        };

        let resp = self.client.post(&self.url_rerank).json(&body).send().await?;
        if !resp.status().is_success() {
            let err = http_error(resp, &self.url_rerank).await;
            error!(error = %err, "rerank request failed");
            return Err(err);
        }

        let parsed: RerankResponse = resp
            .json()
            .await
            .map_err(|e| RerankError::Decode(e.to_string()))?;
        let scores = into_input_order(parsed, documents.len())?;

        debug!(latency_ms = started.elapsed().as_millis(), "rerank completed");
        Ok(scores)
    }
}

impl CrossEncoder for HttpCrossEncoder {
    fn score<'a>(
        &'a self,
        query: &'a str,
        documents: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<f32>, RerankError>> {
        Box::pin(async move {
            if documents.is_empty() {
                return Ok(Vec::new());
            }
            self.score_batch(query, documents).await
        })
    }
}

/// Places each score at its document index; every index must appear once.
fn into_input_order(resp: RerankResponse, n: usize) -> Result<Vec<f32>, RerankError> {
    let pairs: Vec<(usize, f32)> = match resp {
        RerankResponse::Tei(items) => items.into_iter().map(|i| (i.index, i.score)).collect(),
        RerankResponse::Results { results } => results
            .into_iter()
            .map(|r| (r.index, r.relevance_score))
            .collect(),
    };
    if pairs.len() != n {
        return Err(RerankError::CountMismatch {
            got: pairs.len(),
            want: n,
        });
    }

    let mut slots: Vec<Option<f32>> = vec![None; n];
    for (index, score) in pairs {
        let Some(slot) = slots.get_mut(index) else {
            return Err(RerankError::Decode(format!(
                "index {index} out of range for {n} documents"
            )));
        };
        if slot.replace(score).is_some() {
            return Err(RerankError::Decode(format!("duplicate index {index}")));
        }
    }
    // All slots are filled: n distinct in-range indices were placed.
    Ok(slots.into_iter().flatten().collect())
}

async fn http_error(resp: reqwest::Response, url: &str) -> RerankError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    RerankError::HttpStatus {
        status,
        url: url.to_string(),
        snippet: body.trim().chars().take(240).collect(),
    }
}
