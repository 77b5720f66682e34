//! Application error taxonomy and its HTTP mapping.
//!
//! Structural request problems map to 422. Every failure raised while
//! answering a query (connecting, introspecting, calling the model, running
//! the agent) maps to 400 with the underlying message as `detail`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::models::ErrorResponse;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Body could not be read as the expected JSON shape.
    #[error("{0}")]
    InvalidPayload(String),

    /// Body parsed but a field failed validation.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    DatabaseConnection(String),

    #[error("{0}")]
    DatabaseQuery(String),

    #[error("{0}")]
    UnsafeSql(String),

    #[error("{0}")]
    Llm(String),

    #[error("{0}")]
    Agent(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidPayload(_) | AppError::Validation(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::DatabaseConnection(_)
            | AppError::DatabaseQuery(_)
            | AppError::UnsafeSql(_)
            | AppError::Llm(_)
            | AppError::Agent(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Stable machine-readable code, used in logs.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidPayload(_) => "INVALID_PAYLOAD",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::DatabaseConnection(_) => "DATABASE_CONNECTION",
            AppError::DatabaseQuery(_) => "DATABASE_QUERY",
            AppError::UnsafeSql(_) => "UNSAFE_SQL",
            AppError::Llm(_) => "LLM_ERROR",
            AppError::Agent(_) => "AGENT_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::warn!(code = self.code(), status = status.as_u16(), error = %self, "请求失败");
        let body = ErrorResponse {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidPayload(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_execution_errors_are_client_errors() {
        for err in [
            AppError::DatabaseConnection("refused".into()),
            AppError::DatabaseQuery("no such table".into()),
            AppError::UnsafeSql("forbidden operation: DROP".into()),
            AppError::Llm("quota exceeded".into()),
            AppError::Agent("gave up".into()),
        ] {
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_shape_errors_are_unprocessable() {
        assert_eq!(
            AppError::Validation("db_uri".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::InvalidPayload("bad json".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[tokio::test]
    async fn test_response_carries_message_as_detail() {
        let response = AppError::DatabaseConnection("connection refused".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json, serde_json::json!({ "detail": "connection refused" }));
    }
}
