//! 主应用程序入口
//!
//! 加载配置，连接数据库，启动私信 HTTP / SSE 服务。

use std::sync::Arc;

use anyhow::Context;
use application::{
    DirectMessageService, DirectMessageServiceDependencies, LiveConnectionRegistry, PagePolicy,
    SystemClock,
};
use axum::http::HeaderValue;
use config::AppConfig;
use infrastructure::Infrastructure;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;

    // RUST_LOG 优先，否则使用配置中的过滤规则
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(config = %config.sanitize(), "configuration loaded");
    if config.uses_dev_secret() {
        tracing::warn!("使用开发环境 JWT 密钥，请勿用于生产");
    }

    let infrastructure = Infrastructure::connect(&config.database)
        .await
        .context("failed to initialize database")?;
    let storage = infrastructure.storage.clone();

    let registry = LiveConnectionRegistry::new(
        config.live.connection_ttl(),
        config.live.channel_capacity,
    );
    let jwt_service = Arc::new(JwtService::new(config.jwt.clone()));

    let service = DirectMessageService::new(DirectMessageServiceDependencies {
        message_repository: storage.message_repository.clone(),
        user_repository: storage.user_repository.clone(),
        follow_repository: storage.follow_repository.clone(),
        token_verifier: jwt_service,
        clock: Arc::new(SystemClock),
        registry,
    });

    let state = AppState::new(
        Arc::new(service),
        PagePolicy::new(
            config.pagination.default_page_size,
            config.pagination.max_page_size,
        ),
        config.live.keep_alive(),
    );

    let mut app = router(state);
    if let Some(cors) = cors_layer(&config.server.cors_origins) {
        app = app.layer(cors);
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("私信服务启动在 http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// 未配置来源时不挂载 CORS
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }
    if origins.iter().any(|origin| origin == "*") {
        return Some(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(allowed)
            .allow_methods(Any)
            .allow_headers(Any),
    )
}
