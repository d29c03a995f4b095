//! Embedding contract shared by text and image inputs.

use std::{future::Future, pin::Pin};

use thiserror::Error;

pub mod image;
pub mod multimodal;
pub mod normalize;

pub use multimodal::{EmbedderConfig, MultimodalEmbedder};

/// Boxed embedding future.
pub type EmbedFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<f32>, EmbeddingError>> + Send + 'a>>;

/// Maps text and images into one vector space.
///
/// Vectors are L2-normalized and of a fixed dimension. Undecodable input is an
/// [`EmbeddingError`], never a zero vector.
pub trait EmbeddingProvider: Send + Sync {
    fn embed_text<'a>(&'a self, text: &'a str) -> EmbedFuture<'a>;

    fn embed_image<'a>(&'a self, bytes: &'a [u8]) -> EmbedFuture<'a>;
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("empty input")]
    EmptyInput,

    /// Bytes are not one of the supported image formats.
    #[error("unsupported or undecodable image")]
    UnsupportedImage,

    #[error("embedding has zero norm")]
    ZeroVector,

    #[error("vector size mismatch: got {got}, want {want}")]
    DimensionMismatch { got: usize, want: usize },

    #[error("embedding server returned HTTP {status} from {url}: {snippet}")]
    HttpStatus {
        status: reqwest::StatusCode,
        url: String,
        snippet: String,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("decode error: {0}")]
    Decode(String),
}
