//! 路由模块

use axum::{
    routing::{get, post},
    Router,
};
use crate::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/send-message", post(handlers::send_message))
        .route("/api/health", get(handlers::health_check))
}
