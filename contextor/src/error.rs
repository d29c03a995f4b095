//! Typed errors for the contextor crate.

use std::time::Duration;

use ai_llm_service::AiLlmError;
use thiserror::Error;

/// Query rewriting or intent classification failed.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("LLM error: {0}")]
    Llm(#[from] AiLlmError),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The strategy produced nothing usable.
    #[error("empty result")]
    Empty,
}

/// Answer synthesis failed.
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("LLM error: {0}")]
    Llm(#[from] AiLlmError),

    #[error("empty answer")]
    Empty,
}

/// Invalid pipeline configuration.
#[derive(Debug, Error)]
pub enum PipelineConfigError {
    #[error("unknown resolver strategy '{0}' (expected llm|rules)")]
    UnknownStrategy(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidValue {
        var: &'static str,
        reason: &'static str,
    },
}

/// A turn request that cannot be processed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("a turn needs text, an image, or both")]
    Empty,

    #[error("top_k must be between 1 and {max}, got {got}")]
    TopKOutOfRange { got: usize, max: usize },
}
