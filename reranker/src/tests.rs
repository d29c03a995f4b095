//! Reranker ordering and contract tests.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use futures::future::BoxFuture;
use pretty_assertions::assert_eq;
use product_store::{Candidate, ProductMetadata};

use crate::{CandidateReranker, CrossEncoder, RerankError, document_text};

/// Returns fixed scores and records what it was asked.
struct FixedScores {
    scores: Vec<f32>,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl FixedScores {
    fn new(scores: Vec<f32>) -> Arc<Self> {
        Arc::new(Self {
            scores,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }
}

impl CrossEncoder for FixedScores {
    fn score<'a>(
        &'a self,
        _query: &'a str,
        documents: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<f32>, RerankError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().extend(documents.iter().cloned());
        let out = self.scores.clone();
        Box::pin(async move { Ok(out) })
    }
}

fn cand(id: &str, score: f32) -> Candidate {
    Candidate {
        id: id.into(),
        score,
        metadata: ProductMetadata {
            title: format!("Item {id}"),
            descriptive_text: "desc".into(),
            ..Default::default()
        },
    }
}

fn ids(r: &[crate::RankedResult]) -> Vec<&str> {
    r.iter().map(|r| r.candidate.id.as_str()).collect()
}

#[tokio::test]
async fn orders_by_logit_and_truncates() {
    let enc = FixedScores::new(vec![-1.0, 4.0, 2.5, 0.0]);
    let rr = CandidateReranker::new(enc.clone());
    let out = rr
        .rerank(
            "cables",
            vec![cand("a", 0.9), cand("b", 0.1), cand("c", 0.5), cand("d", 0.4)],
            3,
        )
        .await
        .unwrap();

    assert_eq!(ids(&out), vec!["b", "c", "d"]);
    for w in out.windows(2) {
        assert!(w[0].rerank_score >= w[1].rerank_score);
    }
    // Similarity is carried through untouched.
    assert_eq!(out[0].score, 0.1);
    assert_eq!(out[0].rerank_score, Some(4.0));
}

#[tokio::test]
async fn non_finite_logits_rank_last() {
    let enc = FixedScores::new(vec![f32::NAN, 0.5, f32::INFINITY, -3.0]);
    let rr = CandidateReranker::new(enc);
    let out = rr
        .rerank(
            "q",
            vec![cand("nan", 0.9), cand("mid", 0.1), cand("inf", 0.3), cand("low", 0.2)],
            4,
        )
        .await
        .unwrap();

    assert_eq!(ids(&out), vec!["mid", "low", "nan", "inf"]);
    for w in out.windows(2) {
        assert!(w[0].rerank_score >= w[1].rerank_score);
    }
    assert_eq!(out[3].rerank_score, Some(f32::NEG_INFINITY));
}

#[tokio::test]
async fn ties_fall_back_to_similarity_then_input_order() {
    let enc = FixedScores::new(vec![1.0, 1.0, 1.0]);
    let rr = CandidateReranker::new(enc);
    let out = rr
        .rerank("q", vec![cand("low", 0.2), cand("hi", 0.8), cand("low2", 0.2)], 10)
        .await
        .unwrap();
    assert_eq!(ids(&out), vec!["hi", "low", "low2"]);
}

#[tokio::test]
async fn length_is_min_of_k_and_input() {
    let enc = FixedScores::new(vec![0.3, 0.2]);
    let rr = CandidateReranker::new(enc);
    let two = || vec![cand("a", 0.5), cand("b", 0.4)];

    assert_eq!(rr.rerank("q", two(), 0).await.unwrap().len(), 0);
    assert_eq!(rr.rerank("q", two(), 1).await.unwrap().len(), 1);
    assert_eq!(rr.rerank("q", two(), 99).await.unwrap().len(), 2);
}

#[tokio::test]
async fn empty_input_skips_encoder() {
    let enc = FixedScores::new(vec![]);
    let rr = CandidateReranker::new(enc.clone());
    let out = rr.rerank("q", Vec::new(), 3).await.unwrap();
    assert!(out.is_empty());
    assert_eq!(enc.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn wrong_score_count_is_an_error() {
    let enc = FixedScores::new(vec![1.0]);
    let rr = CandidateReranker::new(enc);
    let err = rr
        .rerank("q", vec![cand("a", 0.5), cand("b", 0.4)], 2)
        .await
        .unwrap_err();
    assert!(matches!(err, RerankError::CountMismatch { got: 1, want: 2 }));
}

#[tokio::test]
async fn documents_are_title_dot_truncated_description() {
    let enc = FixedScores::new(vec![0.0]);
    let rr = CandidateReranker::new(enc.clone()).with_max_desc_chars(5);
    let mut c = cand("x", 0.5);
    c.metadata.title = "Lamp".into();
    c.metadata.descriptive_text = "ñandú brillante".into();
    rr.rerank("q", vec![c], 1).await.unwrap();
    assert_eq!(enc.seen.lock().unwrap().as_slice(), ["Lamp. ñandú"]);
}

#[test]
fn default_truncation_is_800_chars() {
    let mut c = cand("x", 0.5);
    c.metadata.descriptive_text = "a".repeat(2000);
    let doc = document_text(&c, crate::DEFAULT_MAX_DESC_CHARS);
    assert_eq!(doc.len(), "Item x. ".len() + 800);
}
