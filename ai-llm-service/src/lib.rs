//! Shared LLM access for the shopping assistant.
//!
//! Two logical profiles are exposed through [`LlmServiceProfiles`]:
//! - `fast`: short, cheap calls (query rewriting, intent classification);
//! - `slow`: answer synthesis.
//!
//! Callers that only need text generation should depend on the
//! [`TextGenerator`] trait so they can be tested with fakes.

pub mod config;
pub mod error_handler;
pub mod generator;
pub mod health_service;
pub mod service_profiles;
pub mod services;

pub use config::{LlmModelConfig, LlmProvider};
pub use error_handler::AiLlmError;
pub use generator::{Profile, TextGenerator};
pub use health_service::HealthStatus;
pub use service_profiles::LlmServiceProfiles;
