//! Conversation context resolution: standalone query rewriting and intent.
//!
//! [`ContextResolver`] owns the invariants; strategies only do the language
//! work:
//! - no prior turns or an attached image: text is returned unchanged;
//! - only the last `window` prior turns reach the strategy;
//! - failure, timeout or empty output: the original text;
//! - image attached, failure or timeout: `SEARCH`.

use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::{conversation::Turn, error::ContextError, query::Intent};

mod llm;
mod rules;

pub use llm::LlmStrategy;
pub use rules::RuleStrategy;

/// Language-level rewriting and classification.
pub trait ResolutionStrategy: Send + Sync {
    /// Rewrites `current` into a standalone query using `window`.
    fn rewrite<'a>(
        &'a self,
        current: &'a str,
        window: &'a [Turn],
    ) -> BoxFuture<'a, Result<String, ContextError>>;

    /// Classifies an effective query.
    fn classify<'a>(
        &'a self,
        query: &'a str,
        window: &'a [Turn],
    ) -> BoxFuture<'a, Result<Intent, ContextError>>;
}

/// Result of a resolver call that may have fallen back.
#[derive(Debug)]
pub struct Resolved<T> {
    pub value: T,
    /// The failure that forced the fallback, if any.
    pub fallback: Option<ContextError>,
}

impl<T> Resolved<T> {
    fn ok(value: T) -> Self {
        Self {
            value,
            fallback: None,
        }
    }
}

/// Strategy wrapper that enforces the resolution invariants.
#[derive(Clone)]
pub struct ContextResolver {
    strategy: Arc<dyn ResolutionStrategy>,
    window: usize,
    timeout: Duration,
}

impl ContextResolver {
    pub fn new(strategy: Arc<dyn ResolutionStrategy>, window: usize, timeout: Duration) -> Self {
        Self {
            strategy,
            window,
            timeout,
        }
    }

    /// Effective query text for `current` given the prior turns.
    pub async fn resolve(&self, current: &str, prior: &[Turn], has_image: bool) -> Resolved<String> {
        if prior.is_empty() || has_image || current.trim().is_empty() || self.window == 0 {
            return Resolved::ok(current.to_string());
        }

        let window = tail(prior, self.window);
        let outcome = tokio::time::timeout(self.timeout, self.strategy.rewrite(current, window))
            .await
            .map_err(|_| ContextError::Timeout(self.timeout))
            .and_then(|r| r);

        match outcome {
            Ok(text) if !text.trim().is_empty() => {
                let text = text.trim().to_string();
                if text != current {
                    debug!(original = %current, rewritten = %text, "query rewritten");
                }
                Resolved::ok(text)
            }
            Ok(_) => fallback(current.to_string(), ContextError::Empty),
            Err(e) => {
                warn!(error = %e, "query rewrite failed; using original text");
                fallback(current.to_string(), e)
            }
        }
    }

    /// Intent of the effective query.
    pub async fn classify(&self, query: &str, prior: &[Turn], has_image: bool) -> Resolved<Intent> {
        if has_image {
            return Resolved::ok(Intent::Search);
        }

        let window = tail(prior, self.window);
        let outcome = tokio::time::timeout(self.timeout, self.strategy.classify(query, window))
            .await
            .map_err(|_| ContextError::Timeout(self.timeout))
            .and_then(|r| r);

        match outcome {
            Ok(intent) => Resolved::ok(intent),
            Err(e) => {
                warn!(error = %e, "intent classification failed; defaulting to SEARCH");
                fallback(Intent::Search, e)
            }
        }
    }
}

fn fallback<T>(value: T, err: ContextError) -> Resolved<T> {
    Resolved {
        value,
        fallback: Some(err),
    }
}

fn tail(turns: &[Turn], n: usize) -> &[Turn] {
    &turns[turns.len().saturating_sub(n)..]
}
