//! 自然语言 SQL 问答服务
//!
//! 接收自然语言问题与数据库连接串，交由 SQL 智能体查询并返回文本答案。

pub mod handlers;
pub mod routes;
pub mod service;
pub mod state;

use axum::http::HeaderValue;
use axum::{middleware, routing::get, Json, Router};
use common::middleware::request_id::request_id_middleware;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use state::AppState;

pub const SERVICE_NAME: &str = "query-service";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SQL 问答服务 API",
        version = "0.1.0",
        description = "用自然语言查询数据库"
    ),
    paths(
        handlers::send_message,
        handlers::health_check,
    ),
    components(schemas(
        common::models::SendMessageRequest,
        common::models::SendMessageResponse,
        common::models::ErrorResponse,
        handlers::HealthResponse,
    )),
    tags(
        (name = "chat", description = "问答端点"),
        (name = "health", description = "健康检查端点")
    )
)]
pub struct ApiDoc;

/// 构建完整路由（含 CORS、请求 ID 与追踪中间件）
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(state.config.frontend_origin.clone());

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// 仅允许配置的前端来源；允许携带凭据，方法与请求头全部放行
fn cors_layer(origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list([origin]))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
