//! Precision reranking of retrieved products.
//!
//! ```ascii
//!  candidates ──► CandidateReranker ──► CrossEncoder::score ──► RankedResult[]
//!                 (pairs, truncation,    (HttpCrossEncoder or
//!                  ordering, top-k)       a test fake)
//! ```

mod error;
mod http;
mod rerank;
mod result;
mod traits;

pub use error::RerankError;
pub use http::{HttpCrossEncoder, RerankerConfig};
pub use rerank::{CandidateReranker, DEFAULT_MAX_DESC_CHARS, document_text};
pub use result::RankedResult;
pub use traits::CrossEncoder;

#[cfg(test)]
mod tests;
