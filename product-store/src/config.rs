//! Runtime and collection configuration.

use std::str::FromStr;

use crate::errors::StoreError;

/// Distance function of the collection.
///
/// Decides how raw Qdrant scores are read: `Cosine` and `Dot` already are
/// similarities, `Euclid` and `Manhattan` are distances and get `1 - d`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistanceKind {
    Cosine,
    Dot,
    Euclid,
    Manhattan,
}

impl DistanceKind {
    /// Converts a raw backend score into a similarity (higher is better).
    pub fn to_similarity(self, raw: f32) -> f32 {
        match self {
            DistanceKind::Cosine | DistanceKind::Dot => raw,
            DistanceKind::Euclid | DistanceKind::Manhattan => 1.0 - raw,
        }
    }
}

impl FromStr for DistanceKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "dot" => Ok(Self::Dot),
            "euclid" | "euclidean" | "l2" => Ok(Self::Euclid),
            "manhattan" | "l1" => Ok(Self::Manhattan),
            other => Err(StoreError::Config(format!(
                "unsupported distance '{other}' (expected cosine|dot|euclid|manhattan)"
            ))),
        }
    }
}

/// Qdrant connection and search settings.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// gRPC endpoint, e.g. `http://localhost:6334`.
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub collection: String,
    pub distance: DistanceKind,
    /// Exact search flag (false = HNSW ANN).
    pub exact_search: bool,
}

impl StoreConfig {
    pub fn new_default(url: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            qdrant_url: url.into(),
            qdrant_api_key: None,
            collection: collection.into(),
            distance: DistanceKind::Cosine,
            exact_search: false,
        }
    }

    /// Reads `QDRANT_URL`, `QDRANT_API_KEY`, `QDRANT_COLLECTION`,
    /// `QDRANT_DISTANCE` and `RAG_EXACT_SEARCH`.
    ///
    /// # Errors
    /// `StoreError::Config` for an unknown distance name.
    pub fn from_env() -> Result<Self, StoreError> {
        let distance = match std::env::var("QDRANT_DISTANCE") {
            Ok(v) if !v.trim().is_empty() => v.parse()?,
            _ => DistanceKind::Cosine,
        };

        Ok(Self {
            qdrant_url: env("QDRANT_URL", "http://127.0.0.1:6334"),
            qdrant_api_key: std::env::var("QDRANT_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            collection: env("QDRANT_COLLECTION", "amazon_products"),
            distance,
            exact_search: env("RAG_EXACT_SEARCH", "false") == "true",
        })
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.qdrant_url.trim().is_empty() {
            return Err(StoreError::Config("qdrant_url is empty".into()));
        }
        if self.collection.trim().is_empty() {
            return Err(StoreError::Config("collection is empty".into()));
        }
        Ok(())
    }
}

fn env(k: &str, dflt: &str) -> String {
    std::env::var(k)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| dflt.to_string())
}
