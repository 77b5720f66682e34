//! Application state for query service.

use std::sync::Arc;

use common::config::AppConfig;
use sql_agent::{GeminiClient, LanguageModel, LlmError};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    /// Process-wide model client; each request binds it to a fresh agent.
    pub llm: Arc<dyn LanguageModel>,
}

impl AppState {
    /// Creates application state backed by the Gemini API.
    pub fn new(config: AppConfig) -> Result<Self, LlmError> {
        let llm = GeminiClient::new(&config.llm)?;
        Ok(Self::with_model(config, Arc::new(llm)))
    }

    /// Creates application state around an arbitrary language model.
    pub fn with_model(config: AppConfig, llm: Arc<dyn LanguageModel>) -> Self {
        Self { config, llm }
    }
}
