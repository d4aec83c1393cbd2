//! # 集成测试辅助
//!
//! 内存数据库、测试数据和可计数的定价来源

#![allow(dead_code)]

use async_trait::async_trait;
use entity::{cloud_api_keys, pricing_overrides};
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use sandbox_billing_proxy::clock::{Clock, ManualClock};
use sandbox_billing_proxy::config::{AppConfig, DatabaseConfig};
use sandbox_billing_proxy::database::{init_database, run_migrations};
use sandbox_billing_proxy::pricing::{ModelPricing, PricingSource, PricingTable};
use sandbox_billing_proxy::usage::{UsageEvent, UsageStore};
use sandbox_billing_proxy::{ProxyError, Result};

pub const VALID_KEY: &str = "sk-cloud-valid-key-0001";
pub const VALID_KEY_ID: &str = "key_test_1";

static INIT: Once = Once::new();

/// 初始化测试日志
pub fn init_test_env() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// 已执行迁移的内存数据库
pub async fn setup_test_db() -> Arc<DatabaseConnection> {
    init_test_env();
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        connect_timeout: 5,
    };
    let db = init_database(&config).await.expect("connect in-memory sqlite");
    run_migrations(&db).await.expect("apply migrations");
    Arc::new(db)
}

/// 写入一条白名单密钥
pub async fn insert_api_key(db: &DatabaseConnection, id: &str, key: &str) {
    cloud_api_keys::Entity::insert(cloud_api_keys::ActiveModel {
        id: Set(id.to_string()),
        key: Set(key.to_string()),
        label: Set(Some("integration".to_string())),
        created_at: Set(1_700_000_000),
    })
    .exec_without_returning(db)
    .await
    .expect("insert api key");
}

/// 写入一条定价覆盖
pub async fn insert_override(db: &DatabaseConnection, model: &str, input: f64, output: f64) {
    pricing_overrides::Entity::insert(pricing_overrides::ActiveModel {
        model: Set(model.to_string()),
        input_per_1k_usd: Set(input),
        output_per_1k_usd: Set(output),
    })
    .exec_without_returning(db)
    .await
    .expect("insert pricing override");
}

pub fn table(entries: &[(&str, f64, f64)]) -> PricingTable {
    entries
        .iter()
        .map(|(model, input, output)| ((*model).to_string(), ModelPricing::new(*input, *output)))
        .collect()
}

/// 记录拉取次数的定价来源
pub struct CountingPricingSource {
    table: PricingTable,
    fetches: AtomicUsize,
}

impl CountingPricingSource {
    pub fn new(table: PricingTable) -> Self {
        Self {
            table,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PricingSource for CountingPricingSource {
    async fn fetch(&self) -> Result<PricingTable> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.table.clone())
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

/// 拉取永不返回的定价来源
pub struct StalledPricingSource;

#[async_trait]
impl PricingSource for StalledPricingSource {
    async fn fetch(&self) -> Result<PricingTable> {
        std::future::pending().await
    }

    fn name(&self) -> &'static str {
        "stalled"
    }
}

/// 始终写入失败的用量存储
pub struct FailingUsageStore;

#[async_trait]
impl UsageStore for FailingUsageStore {
    async fn insert(&self, _event: UsageEvent) -> Result<()> {
        Err(ProxyError::internal("usage store offline"))
    }
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::at_unix(1_700_000_000))
}

pub fn system_clock() -> Arc<dyn Clock> {
    Arc::new(sandbox_billing_proxy::clock::SystemClock)
}

pub fn test_config() -> AppConfig {
    AppConfig::default()
}
