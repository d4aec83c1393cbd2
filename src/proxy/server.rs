//! # HTTP 服务器

use axum::Router;
use axum::routing::{get, post};
use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handler::{chat_handler, health_handler, method_not_allowed};
use crate::app::AppContext;
use crate::config::ServerConfig;
use crate::error::{ProxyError, Result};
use crate::linfo;
use crate::logging::{LogComponent, LogStage};

/// 路由共享状态
#[derive(Clone)]
pub struct AppState {
    context: Arc<AppContext>,
}

impl AppState {
    #[must_use]
    pub const fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }
}

impl Deref for AppState {
    type Target = AppContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

/// 创建路由器
pub fn create_router(context: Arc<AppContext>) -> Router {
    Router::new()
        .route(
            "/agent/chat",
            post(chat_handler).fallback(method_not_allowed),
        )
        .route("/health", get(health_handler))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(AppState::new(context))
}

/// 计费代理服务器
pub struct ProxyServer {
    config: ServerConfig,
    router: Router,
}

impl ProxyServer {
    #[must_use]
    pub fn new(config: ServerConfig, context: Arc<AppContext>) -> Self {
        Self {
            config,
            router: create_router(context),
        }
    }

    /// 启动服务器，`shutdown` 完成后停止接收新连接
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.listen_addr();
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            ProxyError::config_with_source(format!("无法监听地址 {addr}"), e)
        })?;

        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::ServerSetup,
            "server_start",
            &format!("Billing proxy listening on {addr}")
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ProxyError::internal_with_source("HTTP服务器异常退出", e))?;

        Ok(())
    }
}
