//! Language-model abstraction.

mod gemini;

use async_trait::async_trait;
use thiserror::Error;

pub use gemini::GeminiClient;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("language model request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("language model returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("language model blocked the prompt: {0}")]
    Blocked(String),

    #[error("language model returned no content")]
    EmptyResponse,
}

/// A text-completion model with fixed identity and sampling settings.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier, for logging.
    fn model_name(&self) -> &str;

    /// Completes `prompt`, stopping before any of `stop` would be emitted.
    async fn complete(&self, prompt: &str, stop: &[&str]) -> Result<String, LlmError>;
}
