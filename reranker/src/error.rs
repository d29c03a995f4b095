use thiserror::Error;

/// Failure of a scoring call.
#[derive(Debug, Error)]
pub enum RerankError {
    #[error("config error: {0}")]
    Config(String),

    #[error("reranker returned HTTP {status} from {url}: {snippet}")]
    HttpStatus {
        status: reqwest::StatusCode,
        url: String,
        snippet: String,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("decode error: {0}")]
    Decode(String),

    /// The scorer did not return exactly one score per document.
    #[error("score count mismatch: got {got}, want {want}")]
    CountMismatch { got: usize, want: usize },
}
