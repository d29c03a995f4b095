//! Profile configs loaded from environment variables.
//!
//! Two roles are supported for both providers:
//!
//! - **Fast** → query rewriting and intent classification (short outputs,
//!   low temperature so rewrites stay stable);
//! - **Slow** → answer synthesis.
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_KIND` = `ollama` (default) or `openai`
//! - `LLM_MAX_TOKENS` = optional max tokens for the slow profile (u32)
//!
//! Ollama:
//! - `OLLAMA_URL` or `OLLAMA_PORT` (default `http://localhost:11434`)
//! - `OLLAMA_MODEL`       = slow model (required)
//! - `OLLAMA_MODEL_FAST`  = fast model (falls back to `OLLAMA_MODEL`)
//!
//! OpenAI:
//! - `OPENAI_URL` (default `https://api.openai.com`)
//! - `OPENAI_API_KEY` (required)
//! - `OPENAI_MODEL`       = slow model (required)
//! - `OPENAI_MODEL_FAST`  = fast model (falls back to `OPENAI_MODEL`)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, env_opt_u32, must_env, opt_env, validate_http_endpoint,
    },
};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";

/// Provider selected by `LLM_KIND` (Ollama when unset).
pub fn provider_from_env() -> Result<LlmProvider, AiLlmError> {
    match opt_env("LLM_KIND") {
        Some(kind) => Ok(kind.parse::<LlmProvider>()?),
        None => Ok(LlmProvider::Ollama),
    }
}

/// Fast profile for the provider selected in the environment.
pub fn config_fast() -> Result<LlmModelConfig, AiLlmError> {
    match provider_from_env()? {
        LlmProvider::Ollama => config_ollama_fast(),
        LlmProvider::OpenAI => config_openai_fast(),
    }
}

/// Slow profile for the provider selected in the environment.
pub fn config_slow() -> Result<LlmModelConfig, AiLlmError> {
    match provider_from_env()? {
        LlmProvider::Ollama => config_ollama_slow(),
        LlmProvider::OpenAI => config_openai_slow(),
    }
}

/// Resolves the Ollama endpoint.
///
/// Precedence: `OLLAMA_URL`, then `OLLAMA_PORT` on localhost, then the default.
fn ollama_endpoint() -> Result<String, AiLlmError> {
    if let Some(url) = opt_env("OLLAMA_URL") {
        validate_http_endpoint("OLLAMA_URL", &url)?;
        return Ok(url);
    }
    if let Some(port) = opt_env("OLLAMA_PORT") {
        port.trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidNumber {
                var: "OLLAMA_PORT",
                reason: "expected u16 (1..=65535)",
            })?;
        return Ok(format!("http://localhost:{}", port.trim()));
    }
    Ok(DEFAULT_OLLAMA_URL.to_string())
}

fn openai_endpoint() -> Result<String, AiLlmError> {
    let url = opt_env("OPENAI_URL").unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string());
    validate_http_endpoint("OPENAI_URL", &url)?;
    Ok(url)
}

/// Slow Ollama profile (`OLLAMA_MODEL`).
///
/// Defaults: `temperature = 0.3`, `timeout_secs = 120`.
pub fn config_ollama_slow() -> Result<LlmModelConfig, AiLlmError> {
    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model: must_env("OLLAMA_MODEL")?,
        endpoint: ollama_endpoint()?,
        api_key: None,
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(0.3),
        top_p: None,
        timeout_secs: Some(120),
    })
}

/// Fast Ollama profile (`OLLAMA_MODEL_FAST`, falling back to `OLLAMA_MODEL`).
///
/// Defaults: `temperature = 0.0`, `max_tokens = 64`, `timeout_secs = 30`.
pub fn config_ollama_fast() -> Result<LlmModelConfig, AiLlmError> {
    let model = match opt_env("OLLAMA_MODEL_FAST") {
        Some(m) => m,
        None => must_env("OLLAMA_MODEL")?,
    };

    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model,
        endpoint: ollama_endpoint()?,
        api_key: None,
        max_tokens: Some(64),
        temperature: Some(0.0),
        top_p: None,
        timeout_secs: Some(30),
    })
}

/// Slow OpenAI profile (`OPENAI_MODEL`).
pub fn config_openai_slow() -> Result<LlmModelConfig, AiLlmError> {
    Ok(LlmModelConfig {
        provider: LlmProvider::OpenAI,
        model: must_env("OPENAI_MODEL")?,
        endpoint: openai_endpoint()?,
        api_key: Some(must_env("OPENAI_API_KEY")?),
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(0.3),
        top_p: None,
        timeout_secs: Some(120),
    })
}

/// Fast OpenAI profile (`OPENAI_MODEL_FAST`, falling back to `OPENAI_MODEL`).
pub fn config_openai_fast() -> Result<LlmModelConfig, AiLlmError> {
    let model = match opt_env("OPENAI_MODEL_FAST") {
        Some(m) => m,
        None => must_env("OPENAI_MODEL")?,
    };

    Ok(LlmModelConfig {
        provider: LlmProvider::OpenAI,
        model,
        endpoint: openai_endpoint()?,
        api_key: Some(must_env("OPENAI_API_KEY")?),
        max_tokens: Some(64),
        temperature: Some(0.0),
        top_p: None,
        timeout_secs: Some(30),
    })
}
