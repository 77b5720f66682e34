//! Handler模块

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use common::errors::AppError;
use common::extract::ValidatedJson;
use common::models::chat::{ErrorResponse, SendMessageRequest, SendMessageResponse};
use crate::service::QueryService;
use crate::state::AppState;
use crate::SERVICE_NAME;

/// 提交自然语言问题
#[utoipa::path(
    post,
    path = "/send-message",
    tag = "chat",
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "智能体给出答案", body = SendMessageResponse),
        (status = 400, description = "连接、模型或智能体执行失败", body = ErrorResponse),
        (status = 422, description = "请求体结构无效", body = ErrorResponse)
    )
)]
pub async fn send_message(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, AppError> {
    let service = QueryService::new(state.llm.clone(), state.config.agent.clone());

    let message = service.answer(&req.db_uri, &req.query).await?;
    tracing::info!(chars = message.len(), "问题已回答");
    Ok(Json(SendMessageResponse { message }))
}

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "服务运行正常", body = HealthResponse)
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}
