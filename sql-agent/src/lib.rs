//! Text2SQL agent.
//!
//! Answers natural-language questions about a relational database. A
//! [`SqlAgent`] drives a language model through a ReAct loop, giving it the
//! tools in [`SqlToolkit`] to inspect the schema of a [`SqlDatabase`] and
//! run read-only queries against it.

pub mod agent;
pub mod database;
pub mod error;
pub mod llm;
pub mod output_parser;
pub mod prompt;
pub mod toolkit;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use agent::SqlAgent;
pub use database::{Dialect, SqlDatabase};
pub use error::{AgentError, AgentResult};
pub use llm::{GeminiClient, LanguageModel, LlmError};
pub use toolkit::SqlToolkit;
