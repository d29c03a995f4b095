//! Thin adapter around `qdrant-client` to isolate API usage.
//!
//! Everything that touches the Qdrant builders lives here; the rest of the
//! crate only sees `(point_id, raw_score, payload_json)` tuples.

use std::collections::HashMap;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CountPointsBuilder, PointId, SearchParamsBuilder, SearchPointsBuilder, Value as QValue,
    point_id::PointIdOptions, value::Kind,
};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::errors::StoreError;

/// Raw hit before score transformation.
pub(crate) type RawHit = (Option<String>, f32, serde_json::Value);

pub(crate) struct QdrantFacade {
    client: Qdrant,
    pub(crate) collection: String,
}

impl QdrantFacade {
    pub fn new(cfg: &StoreConfig) -> Result<Self, StoreError> {
        cfg.validate()?;

        let mut builder = Qdrant::from_url(&cfg.qdrant_url);
        if let Some(key) = &cfg.qdrant_api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder
            .build()
            .map_err(|e| StoreError::Config(e.to_string()))?;

        Ok(Self {
            client,
            collection: cfg.collection.clone(),
        })
    }

    /// Verifies the collection exists and returns its exact point count.
    pub async fn check_collection(&self) -> Result<u64, StoreError> {
        if !self.client.collection_exists(&self.collection).await? {
            return Err(StoreError::MissingCollection(self.collection.clone()));
        }
        let res = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await?;
        let points = res.result.map(|r| r.count).unwrap_or(0);
        info!(collection = %self.collection, points, "collection is ready");
        Ok(points)
    }

    /// Similarity search with payloads, in backend order.
    pub async fn search(
        &self,
        vector: Vec<f32>,
        limit: u64,
        exact: bool,
    ) -> Result<Vec<RawHit>, StoreError> {
        debug!(collection = %self.collection, limit, exact, "search_points");

        let mut builder =
            SearchPointsBuilder::new(&self.collection, vector, limit).with_payload(true);
        if exact {
            builder = builder.params(SearchParamsBuilder::default().exact(true));
        }

        let res = self.client.search_points(builder).await?;

        Ok(res
            .result
            .into_iter()
            .map(|p| (p.id.and_then(point_id_string), p.score, payload_to_json(p.payload)))
            .collect())
    }
}

fn point_id_string(id: PointId) -> Option<String> {
    match id.point_id_options? {
        PointIdOptions::Num(n) => Some(n.to_string()),
        PointIdOptions::Uuid(u) => Some(u),
    }
}

/// Converts a Qdrant payload into JSON, including nested structs and lists.
fn payload_to_json(payload: HashMap<String, QValue>) -> serde_json::Value {
    serde_json::Value::Object(
        payload
            .into_iter()
            .map(|(k, v)| (k, value_to_json(v)))
            .collect(),
    )
}

fn value_to_json(v: QValue) -> serde_json::Value {
    match v.kind {
        Some(Kind::StringValue(s)) => serde_json::Value::String(s),
        Some(Kind::IntegerValue(i)) => serde_json::Value::Number(i.into()),
        Some(Kind::DoubleValue(f)) => serde_json::json!(f),
        Some(Kind::BoolValue(b)) => serde_json::Value::Bool(b),
        Some(Kind::StructValue(s)) => payload_to_json(s.fields),
        Some(Kind::ListValue(l)) => {
            serde_json::Value::Array(l.values.into_iter().map(value_to_json).collect())
        }
        Some(Kind::NullValue(_)) | None => serde_json::Value::Null,
    }
}
