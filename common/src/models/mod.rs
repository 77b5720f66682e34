//! Request and response models for the HTTP surface.

pub mod chat;

pub use chat::{ErrorResponse, SendMessageRequest, SendMessageResponse};
