//! Agent error types.

use common::errors::AppError;
use thiserror::Error;

use crate::llm::LlmError;

pub type AgentResult<T> = Result<T, AgentError>;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid database URI: {0}")]
    InvalidUri(String),

    #[error("unsupported database scheme: {0}")]
    UnsupportedScheme(String),

    /// The target database could not be reached or opened.
    #[error("{0}")]
    Connection(String),

    /// A query issued while introspecting the database failed.
    #[error("{0}")]
    Database(String),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("could not parse LLM output: `{0}`")]
    OutputParse(String),

    #[error("agent stopped after {0} iterations without a final answer")]
    IterationLimit(usize),
}

impl From<AgentError> for AppError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::InvalidUri(_) | AgentError::UnsupportedScheme(_) | AgentError::Connection(_) => {
                AppError::DatabaseConnection(err.to_string())
            }
            AgentError::Database(_) => AppError::DatabaseQuery(err.to_string()),
            AgentError::Llm(_) => AppError::Llm(err.to_string()),
            AgentError::OutputParse(_) | AgentError::IterationLimit(_) => {
                AppError::Agent(err.to_string())
            }
        }
    }
}
