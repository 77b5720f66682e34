//! Shared building blocks for the chat-with-SQL services.
//!
//! Configuration, the error taxonomy, request/response models, the
//! validating JSON extractor, middleware and the read-only SQL guard.

pub mod config;
pub mod errors;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod utils;
