//! Runtime configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use crate::error::PipelineConfigError;

/// Which resolution strategy backs the context resolver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyKind {
    Llm,
    Rules,
}

impl FromStr for StrategyKind {
    type Err = PipelineConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "llm" => Ok(Self::Llm),
            "rules" | "rule" => Ok(Self::Rules),
            other => Err(PipelineConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Pipeline knobs. All fields have defaults; see [`PipelineConfig::from_env`].
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    pub resolver_strategy: StrategyKind,

    // retrieval / ranking
    pub oversampling_factor: usize,
    pub top_k: usize,
    pub max_top_k: usize,
    pub max_desc_chars: usize,
    pub visual_rerank_phrase: String,

    // history
    pub history_window: usize,
    pub answer_history_window: usize,

    // per-stage bounds
    pub embed_timeout: Duration,
    pub index_timeout: Duration,
    pub rerank_timeout: Duration,
    pub llm_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            resolver_strategy: StrategyKind::Llm,
            oversampling_factor: 4,
            top_k: 3,
            max_top_k: 10,
            max_desc_chars: 800,
            visual_rerank_phrase: "producto similar visualmente".to_string(),
            history_window: 3,
            answer_history_window: 5,
            embed_timeout: Duration::from_millis(10_000),
            index_timeout: Duration::from_millis(5_000),
            rerank_timeout: Duration::from_millis(15_000),
            llm_timeout: Duration::from_millis(60_000),
        }
    }
}

impl PipelineConfig {
    /// Build from environment variables; unparsable numbers keep defaults.
    ///
    /// # Errors
    /// `UnknownStrategy` for a bad `RESOLVER_STRATEGY`, `InvalidValue` when
    /// `TOP_K` exceeds `MAX_TOP_K`.
    ///
    /// # Example
    /// ```
    /// # use contextor::PipelineConfig;
    /// let cfg = PipelineConfig::from_env().unwrap();
    /// assert!(cfg.top_k >= 1);
    /// ```
    pub fn from_env() -> Result<Self, PipelineConfigError> {
        let d = Self::default();

        let resolver_strategy = match std::env::var("RESOLVER_STRATEGY") {
            Ok(v) if !v.trim().is_empty() => v.parse()?,
            _ => d.resolver_strategy,
        };

        let cfg = Self {
            resolver_strategy,
            oversampling_factor: parse("OVERSAMPLING_FACTOR", d.oversampling_factor).max(1),
            top_k: parse("TOP_K", d.top_k).max(1),
            max_top_k: parse("MAX_TOP_K", d.max_top_k).max(1),
            max_desc_chars: parse("MAX_DESC_CHARS", d.max_desc_chars),
            visual_rerank_phrase: env("VISUAL_RERANK_PHRASE", &d.visual_rerank_phrase),
            history_window: parse("HISTORY_WINDOW", d.history_window),
            answer_history_window: parse("ANSWER_HISTORY_WINDOW", d.answer_history_window),
            embed_timeout: millis("EMBED_TIMEOUT_MS", d.embed_timeout),
            index_timeout: millis("INDEX_TIMEOUT_MS", d.index_timeout),
            rerank_timeout: millis("RERANK_TIMEOUT_MS", d.rerank_timeout),
            llm_timeout: millis("LLM_TIMEOUT_MS", d.llm_timeout),
        };

        if cfg.top_k > cfg.max_top_k {
            return Err(PipelineConfigError::InvalidValue {
                var: "TOP_K",
                reason: "must not exceed MAX_TOP_K",
            });
        }
        Ok(cfg)
    }

    /// Index query size for a given final count.
    pub fn fetch_k(&self, top_k: usize) -> usize {
        top_k.saturating_mul(self.oversampling_factor)
    }
}

fn env(k: &str, dflt: &str) -> String {
    std::env::var(k)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| dflt.to_string())
}

fn parse<T: FromStr>(k: &str, dflt: T) -> T {
    std::env::var(k)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(dflt)
}

fn millis(k: &str, dflt: Duration) -> Duration {
    std::env::var(k)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
        .unwrap_or(dflt)
}
