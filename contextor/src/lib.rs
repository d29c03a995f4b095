//! Conversational retrieval-and-rerank pipeline.
//!
//! A turn flows through [`Orchestrator::run_turn`]:
//! context resolution, intent classification, then either a fresh
//! embed/index/rerank pass or reuse of the products already shown, and
//! finally answer composition. Capabilities (LLM, embedder, index,
//! cross-encoder) are injected as trait objects.

pub mod cfg;
pub mod composer;
pub mod conversation;
pub mod error;
pub mod orchestrator;
pub mod prompt;
pub mod query;
pub mod report;
pub mod resolver;

use std::sync::Arc;

use ai_llm_service::TextGenerator;

pub use cfg::{PipelineConfig, StrategyKind};
pub use composer::{AnswerComposer, AnswerRequest, FALLBACK_ANSWER, LlmAnswerComposer};
pub use conversation::{ConversationState, Role, Turn};
pub use error::{ComposeError, ContextError, InputError, PipelineConfigError};
pub use orchestrator::{Degradation, Orchestrator, TurnOutcome, TurnStage};
pub use query::{ImageInput, Intent, Query, TurnInput};
pub use report::{RankingReport, RankingRow};
pub use resolver::{ContextResolver, LlmStrategy, ResolutionStrategy, Resolved, RuleStrategy};

/// Context resolver for the configured strategy, bounded by the LLM timeout.
pub fn build_resolver(cfg: &PipelineConfig, llm: Arc<dyn TextGenerator>) -> ContextResolver {
    let strategy: Arc<dyn ResolutionStrategy> = match cfg.resolver_strategy {
        StrategyKind::Llm => Arc::new(LlmStrategy::new(llm)),
        StrategyKind::Rules => Arc::new(RuleStrategy::new()),
    };
    ContextResolver::new(strategy, cfg.history_window, cfg.llm_timeout)
}
