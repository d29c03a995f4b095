//! Per-turn request and query types.

use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// What the user wants from this turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    /// Fetch new results.
    Search,
    /// Ask about results already shown.
    Details,
}

/// Image attached to a turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    /// Display reference, e.g. the uploaded file name.
    pub reference: String,
}

/// Raw turn request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnInput {
    text: Option<String>,
    image: Option<ImageInput>,
    top_k: Option<usize>,
}

impl TurnInput {
    /// Blank text counts as absent; at least one of text/image is required.
    pub fn new(
        text: Option<String>,
        image: Option<ImageInput>,
        top_k: Option<usize>,
    ) -> Result<Self, InputError> {
        let text = text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        if text.is_none() && image.is_none() {
            return Err(InputError::Empty);
        }
        Ok(Self { text, image, top_k })
    }

    pub fn text(text: impl Into<String>) -> Result<Self, InputError> {
        Self::new(Some(text.into()), None, None)
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn raw_text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn image(&self) -> Option<&ImageInput> {
        self.image.as_ref()
    }

    pub fn top_k(&self) -> Option<usize> {
        self.top_k
    }
}

/// The query a turn was answered for. Fixed once intent is known.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub raw_text: String,
    /// Set only when resolution changed the text.
    pub resolved_text: Option<String>,
    pub intent: Intent,
    pub image_reference: Option<String>,
}

impl Query {
    pub fn effective_text(&self) -> &str {
        self.resolved_text.as_deref().unwrap_or(&self.raw_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_without_image_is_rejected() {
        assert_eq!(TurnInput::text("   ").unwrap_err(), InputError::Empty);
        assert_eq!(TurnInput::new(None, None, Some(3)).unwrap_err(), InputError::Empty);
    }

    #[test]
    fn image_only_turn_is_valid() {
        let img = ImageInput {
            bytes: vec![1, 2, 3],
            reference: "shoe.jpg".into(),
        };
        let t = TurnInput::new(Some(" ".into()), Some(img), None).unwrap();
        assert_eq!(t.raw_text(), None);
        assert_eq!(t.image().map(|i| i.reference.as_str()), Some("shoe.jpg"));
    }

    #[test]
    fn effective_text_prefers_resolution() {
        let mut q = Query {
            raw_text: "que sea HP".into(),
            resolved_text: None,
            intent: Intent::Search,
            image_reference: None,
        };
        assert_eq!(q.effective_text(), "que sea HP");
        q.resolved_text = Some("laptops HP".into());
        assert_eq!(q.effective_text(), "laptops HP");
    }

    #[test]
    fn intent_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&Intent::Details).unwrap(), "\"DETAILS\"");
    }
}
