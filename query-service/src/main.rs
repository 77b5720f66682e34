//! 自然语言 SQL 问答服务入口

use anyhow::Context;
use common::config::AppConfig;
use query_service::state::AppState;
use query_service::{create_router, SERVICE_NAME};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志追踪
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // 加载配置（缺少 GOOGLE_API_KEY 时启动失败）
    let config = AppConfig::load_with_service(SERVICE_NAME).context("加载配置失败")?;

    // 创建应用状态
    let state = AppState::new(config.clone()).context("初始化语言模型客户端失败")?;

    // 创建路由
    let app = create_router(state);

    // 启动服务
    let addr = config.bind_address();
    info!(
        service = SERVICE_NAME,
        address = %addr,
        frontend = %config.frontend_url,
        model = %config.llm.model,
        "启动服务"
    );

    let listener = TcpListener::bind(&addr).await.context("绑定地址失败")?;
    axum::serve(listener, app).await.context("服务运行失败")?;
    Ok(())
}
