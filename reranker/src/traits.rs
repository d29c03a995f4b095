//! Scoring contract.

use futures::future::BoxFuture;

use crate::error::RerankError;

/// Batched query/document relevance scorer.
///
/// Returns one raw logit per document, in input order. Scores are unbounded
/// and must not be normalized by implementations.
pub trait CrossEncoder: Send + Sync {
    fn score<'a>(
        &'a self,
        query: &'a str,
        documents: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<f32>, RerankError>>;
}
