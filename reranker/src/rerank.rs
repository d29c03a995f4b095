//! Candidate reordering with a cross-encoder.

use std::sync::Arc;

use product_store::Candidate;
use tracing::{debug, instrument, warn};

use crate::{error::RerankError, result::RankedResult, traits::CrossEncoder};

/// Descriptive text is cut to this many characters before scoring.
pub const DEFAULT_MAX_DESC_CHARS: usize = 800;

/// Reorders retrieved candidates by cross-encoder relevance.
#[derive(Clone)]
pub struct CandidateReranker {
    encoder: Arc<dyn CrossEncoder>,
    max_desc_chars: usize,
}

impl CandidateReranker {
    pub fn new(encoder: Arc<dyn CrossEncoder>) -> Self {
        Self {
            encoder,
            max_desc_chars: DEFAULT_MAX_DESC_CHARS,
        }
    }

    pub fn with_max_desc_chars(mut self, max: usize) -> Self {
        self.max_desc_chars = max;
        self
    }

    /// Scores every candidate against `query` and returns the best
    /// `min(top_k, candidates.len())`.
    ///
    /// Order: rerank score desc, then similarity desc, then input order.
    /// Empty input returns empty output without calling the encoder.
    ///
    /// # Errors
    /// Propagates encoder failures; a wrong number of scores is
    /// `RerankError::CountMismatch`.
    #[instrument(skip_all, fields(candidates = candidates.len(), top_k))]
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
        top_k: usize,
    ) -> Result<Vec<RankedResult>, RerankError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let documents: Vec<String> = candidates
            .iter()
            .map(|c| document_text(c, self.max_desc_chars))
            .collect();

        let scores = self.encoder.score(query, &documents).await?;
        if scores.len() != candidates.len() {
            return Err(RerankError::CountMismatch {
                got: scores.len(),
                want: candidates.len(),
            });
        }

        // NaN would sort first under total_cmp; non-finite logits rank last.
        let non_finite = scores.iter().filter(|s| !s.is_finite()).count();
        if non_finite > 0 {
            warn!(non_finite, "encoder returned non-finite scores; ranking them last");
        }

        let mut ranked: Vec<RankedResult> = candidates
            .into_iter()
            .zip(scores)
            .map(|(candidate, logit)| RankedResult {
                score: candidate.score,
                candidate,
                rerank_score: Some(if logit.is_finite() {
                    logit
                } else {
                    f32::NEG_INFINITY
                }),
            })
            .collect();

        ranked.sort_by(|a, b| {
            let ra = a.rerank_score.unwrap_or(f32::NEG_INFINITY);
            let rb = b.rerank_score.unwrap_or(f32::NEG_INFINITY);
            rb.total_cmp(&ra).then_with(|| b.score.total_cmp(&a.score))
        });
        ranked.truncate(top_k);

        debug!(
            returned = ranked.len(),
            best = ranked.first().and_then(|r| r.rerank_score),
            "rerank completed"
        );
        Ok(ranked)
    }
}

/// `"{title}. {descriptive_text}"` with the description cut to `max_chars`.
pub fn document_text(candidate: &Candidate, max_chars: usize) -> String {
    let desc: String = candidate
        .metadata
        .descriptive_text
        .chars()
        .take(max_chars)
        .collect();
    format!("{}. {}", candidate.metadata.title, desc)
}
