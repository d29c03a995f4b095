//! Conversation history owned by one session.

use reranker::RankedResult;
use serde::{Deserialize, Serialize};

use crate::report::RankingReport;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in the conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    /// `None` for image-only user turns.
    pub content: Option<String>,
    /// Standalone query the content was rewritten to, when it differs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<String>,
    pub image_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<RankedResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranking: Option<RankingReport>,
}

impl Turn {
    pub fn user(content: Option<String>, image_reference: Option<String>) -> Self {
        Self {
            role: Role::User,
            content,
            resolved: None,
            image_reference,
            products: Vec::new(),
            ranking: None,
        }
    }

    pub fn assistant(
        content: String,
        products: Vec<RankedResult>,
        ranking: Option<RankingReport>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(content),
            resolved: None,
            image_reference: None,
            products,
            ranking,
        }
    }

    pub fn with_resolved(mut self, resolved: Option<String>) -> Self {
        self.resolved = resolved;
        self
    }

    /// Resolved query if there is one, else the text as typed.
    pub fn search_text(&self) -> Option<&str> {
        self.resolved.as_deref().or(self.content.as_deref())
    }

    /// Single-line rendering used in prompts, e.g. `user: [image] rojo`.
    pub fn as_prompt_line(&self) -> String {
        let role = match self.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        let text = self.content.as_deref().unwrap_or("").replace('\n', " ");
        match &self.image_reference {
            Some(_) => format!("{role}: [image] {text}").trim_end().to_string(),
            None => format!("{role}: {text}"),
        }
    }
}

/// Ordered turns plus the product set shown by the last search.
///
/// Mutated only by the orchestrator; callers serialize access per session.
#[derive(Clone, Debug, Default)]
pub struct ConversationState {
    turns: Vec<Turn>,
    last_products: Vec<RankedResult>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last_products(&self) -> &[RankedResult] {
        &self.last_products
    }

    /// The last `n` turns (fewer if the history is shorter).
    pub fn recent(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    pub(crate) fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub(crate) fn replace_last_products(&mut self, products: Vec<RankedResult>) {
        self.last_products = products;
    }
}
