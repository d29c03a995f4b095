//! Answer synthesis from ranked products.

use std::sync::Arc;

use ai_llm_service::{Profile, TextGenerator};
use futures::future::BoxFuture;
use reranker::{DEFAULT_MAX_DESC_CHARS, RankedResult};

use crate::{
    error::ComposeError,
    prompt::{ANSWER_SYSTEM, build_answer_prompt},
    query::Intent,
};

/// Shown when the answer model fails.
pub const FALLBACK_ANSWER: &str =
    "No pude generar una respuesta en este momento. Revisa los productos mostrados o intenta de nuevo.";

/// Everything the composer sees for one turn.
#[derive(Debug, Clone, Copy)]
pub struct AnswerRequest<'a> {
    pub effective_query: &'a str,
    pub intent: Intent,
    pub products: &'a [RankedResult],
    /// Bounded history as prompt lines, oldest first, current utterance last.
    pub history: &'a [String],
}

/// Produces the user-facing answer text.
pub trait AnswerComposer: Send + Sync {
    fn compose<'a>(&'a self, req: AnswerRequest<'a>) -> BoxFuture<'a, Result<String, ComposeError>>;
}

/// Composer backed by the slow LLM profile.
#[derive(Clone)]
pub struct LlmAnswerComposer {
    llm: Arc<dyn TextGenerator>,
    max_desc_chars: usize,
}

impl LlmAnswerComposer {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self {
            llm,
            max_desc_chars: DEFAULT_MAX_DESC_CHARS,
        }
    }

    /// Cap on each product description in the answer prompt.
    pub fn with_max_desc_chars(mut self, max: usize) -> Self {
        self.max_desc_chars = max;
        self
    }
}

impl AnswerComposer for LlmAnswerComposer {
    fn compose<'a>(&'a self, req: AnswerRequest<'a>) -> BoxFuture<'a, Result<String, ComposeError>> {
        Box::pin(async move {
            let prompt = build_answer_prompt(
                req.effective_query,
                req.intent,
                req.products,
                req.history,
                self.max_desc_chars,
            );
            let answer = self
                .llm
                .generate(Profile::Slow, &prompt, Some(ANSWER_SYSTEM.trim()))
                .await?;
            let answer = answer.trim();
            if answer.is_empty() {
                return Err(ComposeError::Empty);
            }
            Ok(answer.to_string())
        })
    }
}
