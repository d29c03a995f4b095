//! Health probes for the chat backends.
//!
//! - Ollama: `GET {endpoint}/api/tags`, model must be listed;
//! - OpenAI: `GET {endpoint}/v1/models` with bearer auth, model must be listed.
//!
//! [`HealthService::check`] never fails: transport and status errors are
//! folded into `HealthStatus { ok: false, .. }` so the result can be returned
//! from `/health` as-is. [`HealthStatus`] is also used by the API layer to
//! report the embedding server, the reranker and the vector index.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{LlmModelConfig, LlmProvider};
use crate::error_handler::{AiLlmError, HealthError, HttpError, make_snippet};

/// Serializable health snapshot for one dependency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthStatus {
    /// Component name, e.g. `Ollama`, `OpenAI`, `reranker`.
    pub component: String,
    pub endpoint: String,
    pub model: Option<String>,
    pub ok: bool,
    pub latency_ms: u128,
    pub message: String,
}

impl HealthStatus {
    pub fn ok(
        component: impl Into<String>,
        endpoint: &str,
        model: Option<&str>,
        latency_ms: u128,
        message: impl Into<String>,
    ) -> Self {
        Self {
            component: component.into(),
            endpoint: endpoint.to_string(),
            model: model.map(str::to_string),
            ok: true,
            latency_ms,
            message: message.into(),
        }
    }

    pub fn fail(
        component: impl Into<String>,
        endpoint: &str,
        model: Option<&str>,
        latency_ms: u128,
        message: impl Into<String>,
    ) -> Self {
        Self {
            ok: false,
            ..Self::ok(component, endpoint, model, latency_ms, message)
        }
    }
}

/// Probe runner sharing a single HTTP client.
#[derive(Debug)]
pub struct HealthService {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl HealthService {
    /// Builds the probe client (default timeout 10s).
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, AiLlmError> {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(10));
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        debug!(
            default_timeout_secs = timeout.as_secs(),
            "HealthService initialized"
        );
        Ok(Self {
            client,
            default_timeout: timeout,
        })
    }

    /// Probes the backend of `cfg`. Never returns an error.
    pub async fn check(&self, cfg: &LlmModelConfig) -> HealthStatus {
        let component = format!("{:?}", cfg.provider);
        let endpoint = cfg.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            warn!(provider = ?cfg.provider, endpoint = %cfg.endpoint, "invalid endpoint");
            return HealthStatus::fail(
                component,
                endpoint,
                Some(&cfg.model),
                0,
                "endpoint is empty or missing http/https",
            );
        }

        let started = Instant::now();
        let listed = match cfg.provider {
            LlmProvider::Ollama => self.list_ollama_models(cfg).await,
            LlmProvider::OpenAI => self.list_openai_models(cfg).await,
        };
        let latency = started.elapsed().as_millis();

        let status = match listed {
            Ok(models) if models.iter().any(|m| model_matches(m, &cfg.model)) => {
                HealthStatus::ok(component, endpoint, Some(&cfg.model), latency, "model is available")
            }
            Ok(_) => HealthStatus::fail(
                component,
                endpoint,
                Some(&cfg.model),
                latency,
                "backend is up, but the model is not listed",
            ),
            Err(e) => {
                HealthStatus::fail(component, endpoint, Some(&cfg.model), latency, e.to_string())
            }
        };

        if status.ok {
            info!(
                component = %status.component,
                model = %cfg.model,
                latency_ms = status.latency_ms,
                "health probe passed"
            );
        } else {
            warn!(
                component = %status.component,
                model = %cfg.model,
                message = %status.message,
                "health probe failed"
            );
        }
        status
    }

    /// Probes several configs sequentially.
    pub async fn check_many(&self, configs: &[LlmModelConfig]) -> Vec<HealthStatus> {
        let mut out = Vec::with_capacity(configs.len());
        for cfg in configs {
            out.push(self.check(cfg).await);
        }
        out
    }

    async fn list_ollama_models(&self, cfg: &LlmModelConfig) -> Result<Vec<String>, AiLlmError> {
        #[derive(Deserialize)]
        struct Tag {
            name: String,
        }
        #[derive(Deserialize)]
        struct Tags {
            #[serde(default)]
            models: Vec<Tag>,
        }

        let url = format!("{}/api/tags", cfg.endpoint.trim_end_matches('/'));
        let req = self.client.get(&url).timeout(self.timeout_for(cfg));
        let tags: Tags = self.fetch_json(req, url).await?;
        Ok(tags.models.into_iter().map(|t| t.name).collect())
    }

    async fn list_openai_models(&self, cfg: &LlmModelConfig) -> Result<Vec<String>, AiLlmError> {
        #[derive(Deserialize)]
        struct ModelItem {
            id: String,
        }
        #[derive(Deserialize)]
        struct Models {
            data: Vec<ModelItem>,
        }

        let api_key = cfg
            .api_key
            .as_deref()
            .ok_or_else(|| HealthError::Decode("missing OpenAI API key".into()))?;
        let auth = header::HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| HealthError::Decode(format!("invalid API key header: {e}")))?;

        let url = format!("{}/v1/models", cfg.endpoint.trim_end_matches('/'));
        let req = self
            .client
            .get(&url)
            .timeout(self.timeout_for(cfg))
            .header(header::AUTHORIZATION, auth);
        let models: Models = self.fetch_json(req, url).await?;
        Ok(models.data.into_iter().map(|m| m.id).collect())
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
        url: String,
    ) -> Result<T, AiLlmError> {
        debug!("GET {}", url);
        let resp = req.send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let snippet = make_snippet(&resp.text().await.unwrap_or_default());
            return Err(HealthError::HttpStatus(HttpError {
                status,
                url,
                snippet,
            })
            .into());
        }
        resp.json::<T>()
            .await
            .map_err(|e| HealthError::Decode(format!("{url}: {e}")).into())
    }

    fn timeout_for(&self, cfg: &LlmModelConfig) -> Duration {
        cfg.timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout)
            .min(self.default_timeout)
    }
}

/// Ollama lists `name:tag`; a bare model name matches its `:latest` tag.
fn model_matches(listed: &str, wanted: &str) -> bool {
    listed == wanted
        || (!wanted.contains(':') && listed.strip_suffix(":latest") == Some(wanted))
}
