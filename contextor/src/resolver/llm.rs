//! Resolution through the fast LLM profile.

use std::sync::Arc;

use ai_llm_service::{Profile, TextGenerator};
use futures::future::BoxFuture;

use super::ResolutionStrategy;
use crate::{
    conversation::Turn,
    error::ContextError,
    prompt::{build_intent_prompt, build_rewrite_prompt, clean_rewrite, parse_intent},
    query::Intent,
};

/// Prompts the fast model for rewrites and one-word intent labels.
#[derive(Clone)]
pub struct LlmStrategy {
    llm: Arc<dyn TextGenerator>,
}

impl LlmStrategy {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }
}

impl ResolutionStrategy for LlmStrategy {
    fn rewrite<'a>(
        &'a self,
        current: &'a str,
        window: &'a [Turn],
    ) -> BoxFuture<'a, Result<String, ContextError>> {
        Box::pin(async move {
            let prompt = build_rewrite_prompt(current, window);
            let raw = self.llm.generate(Profile::Fast, &prompt, None).await?;
            clean_rewrite(&raw).ok_or(ContextError::Empty)
        })
    }

    fn classify<'a>(
        &'a self,
        query: &'a str,
        _window: &'a [Turn],
    ) -> BoxFuture<'a, Result<Intent, ContextError>> {
        Box::pin(async move {
            let prompt = build_intent_prompt(query);
            let raw = self.llm.generate(Profile::Fast, &prompt, None).await?;
            Ok(parse_intent(&raw))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_llm_service::AiLlmError;
    use std::sync::Mutex;

    struct Canned {
        reply: &'static str,
        profiles: Mutex<Vec<Profile>>,
    }

    impl TextGenerator for Canned {
        fn generate<'a>(
            &'a self,
            profile: Profile,
            _prompt: &'a str,
            _system: Option<&'a str>,
        ) -> BoxFuture<'a, Result<String, AiLlmError>> {
            self.profiles.lock().unwrap().push(profile);
            let reply = self.reply.to_string();
            Box::pin(async move { Ok(reply) })
        }
    }

    fn strategy(reply: &'static str) -> (LlmStrategy, Arc<Canned>) {
        let c = Arc::new(Canned {
            reply,
            profiles: Mutex::new(Vec::new()),
        });
        (LlmStrategy::new(c.clone()), c)
    }

    #[tokio::test]
    async fn rewrite_uses_fast_profile_and_cleans_output() {
        let (s, c) = strategy("Search query: \"laptops HP\"\n");
        let h = vec![Turn::user(Some("Busco laptops".into()), None)];
        assert_eq!(s.rewrite("que sea HP", &h).await.unwrap(), "laptops HP");
        assert_eq!(c.profiles.lock().unwrap().as_slice(), [Profile::Fast]);
    }

    #[tokio::test]
    async fn blank_rewrite_is_an_error() {
        let (s, _) = strategy("  ");
        assert!(matches!(s.rewrite("x", &[]).await, Err(ContextError::Empty)));
    }

    #[tokio::test]
    async fn classify_maps_free_text() {
        let (s, _) = strategy("Intent: details");
        assert_eq!(s.classify("¿cuál?", &[]).await.unwrap(), Intent::Details);
    }
}
