//! HTTP client for a multimodal (CLIP-style) embedding server.
//!
//! Talks to an OpenAI-compatible `POST {url}/embeddings` that takes an extra
//! `modality` field (`text` | `image`), the shape served by Infinity and
//! similar CLIP servers. Images are sent inline as base64 `data:` URIs.

use std::time::{Duration, Instant};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use super::{EmbedFuture, EmbeddingError, EmbeddingProvider, image, normalize::l2_normalize};

/// Embedding server settings.
#[derive(Clone, Debug)]
pub struct EmbedderConfig {
    /// Base URL, e.g. `http://127.0.0.1:7997`.
    pub url: String,
    pub model: String,
    /// Expected vector dimension.
    pub dim: usize,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl EmbedderConfig {
    /// Reads `EMBEDDING_URL`, `EMBEDDING_MODEL`, `EMBEDDING_DIM` and
    /// `EMBEDDING_API_KEY`. Unparsable numbers fall back to defaults.
    pub fn from_env() -> Self {
        let var = |k: &str| std::env::var(k).ok().filter(|v| !v.trim().is_empty());
        Self {
            url: var("EMBEDDING_URL").unwrap_or_else(|| "http://127.0.0.1:7997".into()),
            model: var("EMBEDDING_MODEL")
                .unwrap_or_else(|| "openai/clip-vit-base-patch32".into()),
            dim: var("EMBEDDING_DIM")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(512),
            api_key: var("EMBEDDING_API_KEY"),
            timeout_secs: 30,
        }
    }
}

/// Text and image embedder backed by one HTTP server.
#[derive(Clone, Debug)]
pub struct MultimodalEmbedder {
    client: reqwest::Client,
    cfg: EmbedderConfig,
    url_embeddings: String,
    url_models: String,
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum Modality {
    Text,
    Image,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
    modality: Modality,
    encoding_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

impl MultimodalEmbedder {
    /// # Errors
    /// `Decode` for a bad URL scheme, `Transport` if the client cannot be built.
    pub fn new(cfg: EmbedderConfig) -> Result<Self, EmbeddingError> {
        let base = cfg.url.trim().trim_end_matches('/').to_string();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(EmbeddingError::Decode(format!(
                "EMBEDDING_URL must start with http:// or https://, got '{}'",
                cfg.url
            )));
        }

        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(cfg.timeout_secs.max(1)));
        if let Some(key) = &cfg.api_key {
            let mut headers = reqwest::header::HeaderMap::new();
            let value = reqwest::header::HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| EmbeddingError::Decode(format!("invalid API key header: {e}")))?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
            builder = builder.default_headers(headers);
        }

        info!(url = %base, model = %cfg.model, dim = cfg.dim, "MultimodalEmbedder initialized");

        Ok(Self {
            client: builder.build()?,
            url_embeddings: format!("{base}/embeddings"),
            url_models: format!("{base}/models"),
            cfg,
        })
    }

    pub fn dim(&self) -> usize {
        self.cfg.dim
    }

    pub fn model(&self) -> &str {
        &self.cfg.model
    }

    pub fn endpoint(&self) -> &str {
        &self.cfg.url
    }

    /// Probes `GET {url}/models`. Used by the startup check and `/health`.
    pub async fn health(&self) -> Result<(), EmbeddingError> {
        let resp = self.client.get(&self.url_models).send().await?;
        if !resp.status().is_success() {
            return Err(http_error(resp, &self.url_models).await);
        }
        Ok(())
    }

    #[instrument(skip_all, fields(model = %self.cfg.model, ?modality))]
    async fn request(&self, input: &str, modality: Modality) -> Result<Vec<f32>, EmbeddingError> {
        let started = Instant::now();
        let body = EmbeddingRequest {
            model: &self.cfg.model,
            input: [input],
            modality,
            encoding_format: "float",
        };

        let resp = self
            .client
            .post(&self.url_embeddings)
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let err = http_error(resp, &self.url_embeddings).await;
            error!(error = %err, "embedding request failed");
            return Err(err);
        }

        let parsed: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| EmbeddingError::Decode(format!("expected `data[0].embedding`: {e}")))?;
        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| EmbeddingError::Decode("response carried no embeddings".into()))?;

        let vector = check_vector(vector, self.cfg.dim)?;
        debug!(latency_ms = started.elapsed().as_millis(), "embedding completed");
        Ok(vector)
    }
}

impl EmbeddingProvider for MultimodalEmbedder {
    fn embed_text<'a>(&'a self, text: &'a str) -> EmbedFuture<'a> {
        Box::pin(async move {
            let text = text.trim();
            if text.is_empty() {
                return Err(EmbeddingError::EmptyInput);
            }
            self.request(text, Modality::Text).await
        })
    }

    fn embed_image<'a>(&'a self, bytes: &'a [u8]) -> EmbedFuture<'a> {
        Box::pin(async move {
            let uri = to_data_uri(bytes)?;
            self.request(&uri, Modality::Image).await
        })
    }
}

/// Encodes a supported image as `data:<mime>;base64,...`.
fn to_data_uri(bytes: &[u8]) -> Result<String, EmbeddingError> {
    if bytes.is_empty() {
        return Err(EmbeddingError::EmptyInput);
    }
    let format = image::sniff(bytes).ok_or(EmbeddingError::UnsupportedImage)?;
    Ok(format!("data:{};base64,{}", format.mime(), STANDARD.encode(bytes)))
}

fn check_vector(vector: Vec<f32>, dim: usize) -> Result<Vec<f32>, EmbeddingError> {
    if vector.len() != dim {
        return Err(EmbeddingError::DimensionMismatch {
            got: vector.len(),
            want: dim,
        });
    }
    l2_normalize(vector)
}

async fn http_error(resp: reqwest::Response, url: &str) -> EmbeddingError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    EmbeddingError::HttpStatus {
        status,
        url: url.to_string(),
        snippet: body.trim().chars().take(240).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> EmbedderConfig {
        EmbedderConfig {
            url: "http://127.0.0.1:7997/".into(),
            model: "clip".into(),
            dim: 3,
            api_key: None,
            timeout_secs: 1,
        }
    }

    #[test]
    fn request_carries_modality() {
        let req = EmbeddingRequest {
            model: "clip",
            input: ["data:image/png;base64,AAA"],
            modality: Modality::Image,
            encoding_format: "float",
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["modality"], "image");
        assert_eq!(v["input"][0], "data:image/png;base64,AAA");
    }

    #[test]
    fn urls_are_derived_from_base() {
        let e = MultimodalEmbedder::new(cfg()).unwrap();
        assert_eq!(e.url_embeddings, "http://127.0.0.1:7997/embeddings");
        assert_eq!(e.url_models, "http://127.0.0.1:7997/models");
    }

    #[test]
    fn data_uri_uses_sniffed_mime() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00];
        let uri = to_data_uri(&jpeg).unwrap();
        assert!(uri.starts_with("data:image/jpeg;base64,"));
        assert!(matches!(to_data_uri(b"nope"), Err(EmbeddingError::UnsupportedImage)));
        assert!(matches!(to_data_uri(b""), Err(EmbeddingError::EmptyInput)));
    }

    #[test]
    fn vectors_are_checked_and_normalized() {
        let v = check_vector(vec![0.0, 3.0, 4.0], 3).unwrap();
        assert!((v[2] - 0.8).abs() < 1e-6);
        assert!(matches!(
            check_vector(vec![1.0; 4], 3),
            Err(EmbeddingError::DimensionMismatch { got: 4, want: 3 })
        ));
    }

    #[tokio::test]
    async fn empty_text_fails_without_network() {
        let e = MultimodalEmbedder::new(cfg()).unwrap();
        assert!(matches!(e.embed_text("   ").await, Err(EmbeddingError::EmptyInput)));
    }
}
