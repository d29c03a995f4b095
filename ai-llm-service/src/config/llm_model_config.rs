use crate::config::llm_provider::LlmProvider;

/// Configuration of one chat model profile.
///
/// # Examples
///
/// ```
/// use ai_llm_service::{LlmModelConfig, LlmProvider};
///
/// let cfg = LlmModelConfig {
///     provider: LlmProvider::Ollama,
///     model: "qwen3:8b".to_string(),
///     endpoint: "http://localhost:11434".to_string(),
///     api_key: None,
///     max_tokens: Some(256),
///     temperature: Some(0.0),
///     top_p: None,
///     timeout_secs: Some(30),
/// };
/// assert_eq!(cfg.provider, LlmProvider::Ollama);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LlmModelConfig {
    /// Backend serving the model.
    pub provider: LlmProvider,

    /// Model identifier (e.g. `"qwen3:8b"`, `"gpt-4o-mini"`).
    pub model: String,

    /// Base URL of the backend, without the API path.
    pub endpoint: String,

    /// API key, required for OpenAI.
    pub api_key: Option<String>,

    /// Maximum number of tokens to generate.
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    pub temperature: Option<f32>,

    /// Nucleus sampling parameter.
    pub top_p: Option<f32>,

    /// HTTP client timeout in seconds.
    pub timeout_secs: Option<u64>,
}
