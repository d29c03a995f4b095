//! Shared LLM service with two profiles: `fast` and `slow`.
//!
//! - Construct once, wrap in `Arc`, pass clones to dependents.
//! - Clients are built eagerly in [`LlmServiceProfiles::new`]; when both
//!   profiles carry the same config they share one client.
//! - If `slow` is not provided, it falls back to `fast`.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use ai_llm_service::{LlmModelConfig, LlmProvider, LlmServiceProfiles};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let fast = LlmModelConfig {
//!     provider: LlmProvider::Ollama,
//!     model: "qwen3:8b".into(),
//!     endpoint: "http://localhost:11434".into(),
//!     api_key: None,
//!     max_tokens: Some(64),
//!     temperature: Some(0.0),
//!     top_p: None,
//!     timeout_secs: Some(30),
//! };
//! let svc = Arc::new(LlmServiceProfiles::new(fast, None, Some(10))?);
//! let txt = svc.generate_fast("Say hi", None).await?;
//! println!("{txt}");
//! # Ok(()) }
//! ```

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::info;

use crate::{
    config::{LlmModelConfig, LlmProvider, default_config},
    error_handler::AiLlmError,
    generator::{Profile, TextGenerator},
    health_service::{HealthService, HealthStatus},
    services::{ollama_service::OllamaService, open_ai_service::OpenAiService},
};

/// Provider-specific client behind a profile.
#[derive(Debug, Clone)]
enum Client {
    Ollama(Arc<OllamaService>),
    OpenAI(Arc<OpenAiService>),
}

impl Client {
    fn build(cfg: &LlmModelConfig) -> Result<Self, AiLlmError> {
        Ok(match cfg.provider {
            LlmProvider::Ollama => Client::Ollama(Arc::new(OllamaService::new(cfg.clone())?)),
            LlmProvider::OpenAI => Client::OpenAI(Arc::new(OpenAiService::new(cfg.clone())?)),
        })
    }

    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, AiLlmError> {
        match self {
            Client::Ollama(c) => c.generate(prompt, system).await,
            Client::OpenAI(c) => c.generate(prompt, system).await,
        }
    }
}

/// Fast + slow chat profiles with their clients and a health checker.
#[derive(Debug)]
pub struct LlmServiceProfiles {
    fast: LlmModelConfig,
    slow: LlmModelConfig,
    fast_client: Client,
    slow_client: Client,
    health: HealthService,
}

impl LlmServiceProfiles {
    /// Creates the service; `slow_opt = None` reuses the fast profile.
    ///
    /// # Errors
    /// Fails when a client cannot be constructed (wrong provider/endpoint,
    /// missing API key, TLS setup).
    pub fn new(
        fast: LlmModelConfig,
        slow_opt: Option<LlmModelConfig>,
        health_timeout_secs: Option<u64>,
    ) -> Result<Self, AiLlmError> {
        let slow = slow_opt.unwrap_or_else(|| fast.clone());
        let fast_client = Client::build(&fast)?;
        let slow_client = if slow == fast {
            fast_client.clone()
        } else {
            Client::build(&slow)?
        };

        info!(
            provider = ?fast.provider,
            fast_model = %fast.model,
            slow_model = %slow.model,
            "LLM profiles ready"
        );

        Ok(Self {
            fast,
            slow,
            fast_client,
            slow_client,
            health: HealthService::new(health_timeout_secs)?,
        })
    }

    /// Builds both profiles from `LLM_KIND` and the provider variables.
    pub fn from_env(health_timeout_secs: Option<u64>) -> Result<Self, AiLlmError> {
        let fast = default_config::config_fast()?;
        let slow = default_config::config_slow()?;
        Self::new(fast, Some(slow), health_timeout_secs)
    }

    pub async fn generate_fast(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<String, AiLlmError> {
        self.fast_client.generate(prompt, system).await
    }

    pub async fn generate_slow(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<String, AiLlmError> {
        self.slow_client.generate(prompt, system).await
    }

    /// Health of every distinct profile; identical profiles are probed once.
    pub async fn health_all(&self) -> Vec<HealthStatus> {
        let mut list = vec![self.fast.clone()];
        if self.slow != self.fast {
            list.push(self.slow.clone());
        }
        self.health.check_many(&list).await
    }

    /// `(fast, slow)` configs.
    pub fn profiles(&self) -> (&LlmModelConfig, &LlmModelConfig) {
        (&self.fast, &self.slow)
    }
}

impl TextGenerator for LlmServiceProfiles {
    fn generate<'a>(
        &'a self,
        profile: Profile,
        prompt: &'a str,
        system: Option<&'a str>,
    ) -> BoxFuture<'a, Result<String, AiLlmError>> {
        Box::pin(async move {
            match profile {
                Profile::Fast => self.generate_fast(prompt, system).await,
                Profile::Slow => self.generate_slow(prompt, system).await,
            }
        })
    }
}
