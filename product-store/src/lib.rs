//! Product retrieval over Qdrant plus the multimodal embedding client.
//!
//! This crate provides:
//! - [`SimilarityIndex`], the read-only query contract, and its Qdrant
//!   implementation [`ProductStore`];
//! - [`embed::EmbeddingProvider`] and the HTTP [`embed::MultimodalEmbedder`]
//!   that maps text and images into the same vector space.
//!
//! The index is assumed to be populated elsewhere; nothing here writes to it.

mod candidate;
mod config;
mod errors;
mod qdrant_facade;

pub mod embed;

pub use candidate::{Candidate, ProductMetadata};
pub use config::{DistanceKind, StoreConfig};
pub use errors::StoreError;

use std::{future::Future, pin::Pin};

use tracing::{debug, instrument};

/// Read-only similarity search.
pub trait SimilarityIndex: Send + Sync {
    /// Returns up to `k` candidates ordered by descending similarity.
    /// An empty index yields an empty list.
    fn query<'a>(
        &'a self,
        vector: &'a [f32],
        k: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Candidate>, StoreError>> + Send + 'a>>;
}

/// Collection readiness reported by [`ProductStore::ensure_ready`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexStatus {
    pub collection: String,
    pub points: u64,
}

/// Qdrant-backed product index.
pub struct ProductStore {
    cfg: StoreConfig,
    client: qdrant_facade::QdrantFacade,
}

impl ProductStore {
    /// # Errors
    /// `StoreError::Config` if the config is invalid or the client cannot be built.
    pub fn new(cfg: StoreConfig) -> Result<Self, StoreError> {
        let client = qdrant_facade::QdrantFacade::new(&cfg)?;
        Ok(Self { cfg, client })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.cfg
    }

    /// Checks that the collection exists and is queryable.
    ///
    /// Meant for startup; an empty collection is reported, not rejected.
    pub async fn ensure_ready(&self) -> Result<IndexStatus, StoreError> {
        let points = self.client.check_collection().await?;
        Ok(IndexStatus {
            collection: self.client.collection.clone(),
            points,
        })
    }

    #[instrument(skip_all, fields(collection = %self.cfg.collection, k))]
    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<Candidate>, StoreError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let raw = self
            .client
            .search(vector.to_vec(), k as u64, self.cfg.exact_search)
            .await?;

        let candidates = to_candidates(raw, self.cfg.distance);
        debug!(hits = candidates.len(), "similarity search completed");
        Ok(candidates)
    }
}

impl SimilarityIndex for ProductStore {
    fn query<'a>(
        &'a self,
        vector: &'a [f32],
        k: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Candidate>, StoreError>> + Send + 'a>> {
        Box::pin(self.search(vector, k))
    }
}

/// Applies the distance transform and re-sorts by similarity (stable).
fn to_candidates(raw: Vec<qdrant_facade::RawHit>, distance: DistanceKind) -> Vec<Candidate> {
    let mut out: Vec<Candidate> = raw
        .into_iter()
        .map(|(id, score, payload)| {
            Candidate::from_hit(id, distance.to_similarity(score), &payload)
        })
        .collect();
    out.sort_by(|a, b| b.score.total_cmp(&a.score));
    out
}
