use product_store::Candidate;
use serde::{Deserialize, Serialize};

/// A candidate with its precision relevance score.
///
/// `score` is the similarity the candidate was retrieved with; `rerank_score`
/// is the raw cross-encoder logit, `None` when reranking was skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub candidate: Candidate,
    pub score: f32,
    pub rerank_score: Option<f32>,
}

impl RankedResult {
    /// Wraps a candidate that was not reranked.
    pub fn unranked(candidate: Candidate) -> Self {
        Self {
            score: candidate.score,
            candidate,
            rerank_score: None,
        }
    }
}
