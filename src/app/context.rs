//! 应用上下文
//!
//! 统一持有请求流水线及其依赖，便于在测试中注入替身实现。

use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio_util::task::TaskTracker;

use crate::auth::{ApiKeyValidator, CredentialStore, DbCredentialStore};
use crate::clock::{Clock, SystemClock};
use crate::config::{AppConfig, PricingSourceKind, UpstreamMode};
use crate::database::{init_database, run_migrations};
use crate::error::{Context, ProxyError, Result};
use crate::linfo;
use crate::logging::{LogComponent, LogStage};
use crate::pricing::{
    DbPricingOverrideStore, EmptyPricingSource, FeeCalculator, FilePricingSource, PricingCache,
    PricingOverrideStore, PricingResolver, PricingSource, RedisPricingSource,
};
use crate::proxy::{ChatBackend, ChatPipeline, HttpChatBackend, SimulatedChatBackend};
use crate::usage::{DbUsageStore, UsageRecorder, UsageStore};

/// 流水线依赖的外部能力
pub struct AppServices {
    pub credentials: Arc<dyn CredentialStore>,
    pub overrides: Arc<dyn PricingOverrideStore>,
    pub pricing_source: Arc<dyn PricingSource>,
    pub usage_store: Arc<dyn UsageStore>,
    pub backend: Arc<dyn ChatBackend>,
    pub clock: Arc<dyn Clock>,
}

impl AppServices {
    /// 按配置创建数据库、批量定价来源和上游后端
    pub fn from_config(config: &AppConfig, db: Arc<DatabaseConnection>) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Ok(Self {
            credentials: Arc::new(DbCredentialStore::new(Arc::clone(&db))),
            overrides: Arc::new(DbPricingOverrideStore::new(Arc::clone(&db))),
            pricing_source: pricing_source(config)?,
            usage_store: Arc::new(DbUsageStore::new(db)),
            backend: chat_backend(config, Arc::clone(&clock))?,
            clock,
        })
    }
}

fn pricing_source(config: &AppConfig) -> Result<Arc<dyn PricingSource>> {
    let pricing = &config.pricing;
    Ok(match pricing.source {
        PricingSourceKind::Redis => {
            let url = pricing
                .redis_url
                .as_deref()
                .ok_or_else(|| ProxyError::config("pricing.redis_url 未配置"))?;
            Arc::new(
                RedisPricingSource::new(url, pricing.blob_key.clone())?
                    .with_timeout(pricing.fetch_timeout()),
            )
        }
        PricingSourceKind::File => {
            let path = pricing
                .file_path
                .as_deref()
                .ok_or_else(|| ProxyError::config("pricing.file_path 未配置"))?;
            Arc::new(FilePricingSource::new(path))
        }
        PricingSourceKind::None => Arc::new(EmptyPricingSource),
    })
}

fn chat_backend(config: &AppConfig, clock: Arc<dyn Clock>) -> Result<Arc<dyn ChatBackend>> {
    let upstream = &config.upstream;
    Ok(match upstream.mode {
        UpstreamMode::Forward => {
            let base_url = upstream
                .base_url
                .as_deref()
                .ok_or_else(|| ProxyError::config("upstream.base_url 未配置"))?;
            Arc::new(HttpChatBackend::new(
                base_url,
                upstream.api_key.clone(),
                upstream.timeout(),
            )?)
        }
        UpstreamMode::Simulate => Arc::new(SimulatedChatBackend::new(clock)),
    })
}

/// 应用上下文
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub pipeline: Arc<ChatPipeline>,
    pub pricing_cache: Arc<PricingCache>,
    pub recorder: Arc<UsageRecorder>,
}

impl AppContext {
    /// 连接数据库、执行迁移并装配所有服务
    pub async fn initialize(config: Arc<AppConfig>) -> Result<Self> {
        let db = init_database(&config.database).await?;
        run_migrations(&db).await.context("执行数据库迁移失败")?;
        let services = AppServices::from_config(&config, Arc::new(db))?;
        Ok(Self::from_services(config, services))
    }

    #[must_use]
    pub fn from_services(config: Arc<AppConfig>, services: AppServices) -> Self {
        let pricing_cache = Arc::new(
            PricingCache::new(
                services.pricing_source,
                config.pricing.cache_ttl(),
                Arc::clone(&services.clock),
            )
            .with_fetch_timeout(config.pricing.fetch_timeout())
            .with_failure_ttl(config.pricing.failure_retry()),
        );
        let resolver = Arc::new(PricingResolver::new(
            services.overrides,
            Arc::clone(&pricing_cache),
        ));
        let calculator = Arc::new(FeeCalculator::new(resolver, config.billing.fee_rate()));
        let recorder = Arc::new(UsageRecorder::new(
            services.usage_store,
            services.clock,
            TaskTracker::new(),
        ));

        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::ServerSetup,
            "context_ready",
            "Application context assembled",
            backend = services.backend.name(),
            fee_rate = %calculator.fee_rate(),
            pricing_ttl_seconds = config.pricing.cache_ttl_seconds,
            pricing_fetch_timeout_seconds = config.pricing.fetch_timeout_seconds,
        );

        let pipeline = Arc::new(ChatPipeline::new(
            ApiKeyValidator::new(services.credentials),
            services.backend,
            calculator,
            Arc::clone(&recorder),
            config.billing.default_session.clone(),
        ));

        Self {
            config,
            pipeline,
            pricing_cache,
            recorder,
        }
    }

    /// 等待所有用量写入完成
    pub async fn shutdown(&self) {
        self.recorder.shutdown().await;
    }
}
