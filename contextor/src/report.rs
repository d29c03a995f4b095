//! Ranking audit table attached to reranked turns.

use reranker::RankedResult;
use serde::{Deserialize, Serialize};

const TITLE_CHARS: usize = 30;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankingRow {
    /// Title cut to 30 characters.
    pub title: String,
    pub similarity: f32,
    pub rerank_score: f32,
}

/// One row per final result: similarity next to the rerank logit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingReport {
    pub rows: Vec<RankingRow>,
}

impl RankingReport {
    /// `None` unless there are results and every one of them was reranked.
    pub fn from_results(results: &[RankedResult]) -> Option<Self> {
        if results.is_empty() {
            return None;
        }
        let rows = results
            .iter()
            .map(|r| {
                Some(RankingRow {
                    title: r.candidate.metadata.title.chars().take(TITLE_CHARS).collect(),
                    similarity: r.score,
                    rerank_score: r.rerank_score?,
                })
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Self { rows })
    }
}
