//! Candidate products returned by similarity search.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Product metadata carried in the point payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductMetadata {
    pub title: String,
    /// Price as listed in the catalogue (free-form, may be absent).
    pub price: Option<String>,
    pub descriptive_text: String,
    pub image_reference: Option<String>,
    /// Groups several image views of one product. Never used to deduplicate.
    pub group_key: Option<String>,
}

/// One similarity-search hit. Immutable once produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    /// Similarity, higher is better.
    pub score: f32,
    pub metadata: ProductMetadata,
}

impl ProductMetadata {
    /// Maps a point payload, accepting the common field aliases.
    pub fn from_payload(payload: &Value) -> Self {
        Self {
            title: first_str(payload, &["title", "name"]).unwrap_or_default(),
            price: first_str(payload, &["price"]),
            descriptive_text: first_str(payload, &["text_content", "description"])
                .unwrap_or_default(),
            image_reference: first_str(payload, &["image_path", "image_url"]),
            group_key: first_str(payload, &["parent_asin", "group_key"]),
        }
    }
}

impl Candidate {
    /// Builds a candidate; the payload `item_id`/`id` wins over the point id.
    pub fn from_hit(point_id: Option<String>, score: f32, payload: &Value) -> Self {
        let id = first_str(payload, &["item_id", "id"])
            .or(point_id)
            .unwrap_or_default();
        Self {
            id,
            score,
            metadata: ProductMetadata::from_payload(payload),
        }
    }
}

/// First non-empty scalar under any of `keys`, rendered as a string.
fn first_str(payload: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match payload.get(*k)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}
