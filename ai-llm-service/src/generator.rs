//! Text generation seam used by the pipeline.

use futures::future::BoxFuture;

use crate::error_handler::AiLlmError;

/// Which configured model answers a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
    /// Short deterministic calls: rewriting and classification.
    Fast,
    /// Answer synthesis.
    Slow,
}

/// Anything that can turn a prompt into text.
///
/// Implemented by [`crate::LlmServiceProfiles`]; tests use in-memory fakes.
pub trait TextGenerator: Send + Sync {
    fn generate<'a>(
        &'a self,
        profile: Profile,
        prompt: &'a str,
        system: Option<&'a str>,
    ) -> BoxFuture<'a, Result<String, AiLlmError>>;
}
