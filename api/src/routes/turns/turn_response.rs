use contextor::{Degradation, Intent, RankingRow, TurnOutcome, TurnStage};
use reranker::RankedResult;
use serde::Serialize;

/// Response payload for `POST /sessions/{id}/turns`.
#[derive(Debug, Serialize)]
pub struct TurnResponse {
    pub session_id: String,
    pub effective_query: String,
    pub intent: Intent,
    pub answer: String,
    pub products: Vec<ProductView>,
    /// Similarity vs. rerank table; absent when nothing was reranked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking: Option<Vec<RankingRow>>,
    pub degradations: Vec<Degradation>,
    pub stages: Vec<TurnStage>,
}

/// One product card.
#[derive(Debug, Serialize)]
pub struct ProductView {
    pub id: String,
    pub title: String,
    pub price: Option<String>,
    pub description: String,
    pub image_reference: Option<String>,
    pub group_key: Option<String>,
    pub similarity: f32,
    pub rerank_score: Option<f32>,
}

impl From<&RankedResult> for ProductView {
    fn from(r: &RankedResult) -> Self {
        let m = &r.candidate.metadata;
        Self {
            id: r.candidate.id.clone(),
            title: m.title.clone(),
            price: m.price.clone(),
            description: m.descriptive_text.clone(),
            image_reference: m.image_reference.clone(),
            group_key: m.group_key.clone(),
            similarity: r.score,
            rerank_score: r.rerank_score,
        }
    }
}

impl TurnResponse {
    pub fn from_outcome(session_id: String, outcome: TurnOutcome) -> Self {
        Self {
            session_id,
            effective_query: outcome.query.effective_text().to_string(),
            intent: outcome.query.intent,
            answer: outcome.answer,
            products: outcome.products.iter().map(ProductView::from).collect(),
            ranking: outcome.report.map(|r| r.rows),
            degradations: outcome.degradations,
            stages: outcome.stages,
        }
    }
}
