//! # 批量定价来源
//!
//! 批量定价表是一个 JSON 对象：模型名 → `{input_per_1k_usd, output_per_1k_usd}`。
//! 生产环境存放在键值存储的 `PRICING_V1` 键下。

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{ModelPricing, PricingTable};
use crate::error::{ProxyError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, lwarn};

/// 批量定价表来源
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PricingSource: Send + Sync {
    /// 拉取完整定价表；定价数据不存在时返回空表
    async fn fetch(&self) -> Result<PricingTable>;

    /// 来源名称（日志）
    fn name(&self) -> &'static str;
}

/// 解析批量定价 JSON
///
/// 顶层必须是对象。单个条目格式错误或单价为负时跳过该条目。
pub fn parse_pricing_blob(raw: &str) -> Result<PricingTable> {
    let entries: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)
        .map_err(|e| ProxyError::pricing_unavailable_with_source("定价JSON格式错误", e))?;

    let total = entries.len();
    let table: PricingTable = entries
        .into_iter()
        .filter_map(|(model, value)| {
            serde_json::from_value::<ModelPricing>(value)
                .ok()
                .filter(ModelPricing::is_valid)
                .map(|pricing| (model, pricing))
        })
        .collect();

    if table.len() < total {
        lwarn!(
            "system",
            LogStage::Pricing,
            LogComponent::PricingSource,
            "pricing_entries_skipped",
            "Skipped malformed pricing entries",
            skipped = total - table.len(),
            kept = table.len(),
        );
    }

    Ok(table)
}

/// 建立连接时的重试次数
const CONNECT_RETRIES: usize = 1;

/// Redis 键值来源
pub struct RedisPricingSource {
    client: redis::Client,
    key: String,
    timeout: Duration,
    connection: Mutex<Option<ConnectionManager>>,
}

impl RedisPricingSource {
    /// 创建来源；连接在首次拉取时建立
    pub fn new(redis_url: &str, key: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| ProxyError::config_with_source("无效的Redis URL", e))?;
        Ok(Self {
            client,
            key: key.into(),
            timeout: super::DEFAULT_FETCH_TIMEOUT,
            connection: Mutex::new(None),
        })
    }

    /// 连接与命令响应超时
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 已有连接直接复用；建立新连接期间不持有锁
    async fn connection(&self) -> Result<ConnectionManager> {
        let cached = self.connection.lock().await.clone();
        if let Some(conn) = cached {
            return Ok(conn);
        }

        let config = ConnectionManagerConfig::new()
            .set_connection_timeout(self.timeout)
            .set_response_timeout(self.timeout)
            .set_number_of_retries(CONNECT_RETRIES);
        let conn = ConnectionManager::new_with_config(self.client.clone(), config).await?;

        let mut guard = self.connection.lock().await;
        Ok(guard.get_or_insert(conn).clone())
    }
}

#[async_trait]
impl PricingSource for RedisPricingSource {
    async fn fetch(&self) -> Result<PricingTable> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn.get(&self.key).await?;

        match raw {
            Some(raw) => parse_pricing_blob(&raw),
            None => {
                ldebug!(
                    "system",
                    LogStage::Pricing,
                    LogComponent::PricingSource,
                    "pricing_blob_missing",
                    "Pricing key not present, using empty table",
                    key = %self.key,
                );
                Ok(PricingTable::new())
            }
        }
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

/// 本地 JSON 文件来源
#[derive(Debug, Clone)]
pub struct FilePricingSource {
    path: PathBuf,
}

impl FilePricingSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PricingSource for FilePricingSource {
    async fn fetch(&self) -> Result<PricingTable> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            ProxyError::pricing_unavailable_with_source(
                format!("读取定价文件失败: {}", self.path.display()),
                e,
            )
        })?;
        parse_pricing_blob(&raw)
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// 固定内容的内存来源
#[derive(Debug, Clone, Default)]
pub struct StaticPricingSource {
    table: Arc<PricingTable>,
}

impl StaticPricingSource {
    #[must_use]
    pub fn new(table: PricingTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }
}

#[async_trait]
impl PricingSource for StaticPricingSource {
    async fn fetch(&self) -> Result<PricingTable> {
        Ok((*self.table).clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// 未配置批量定价时使用
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyPricingSource;

#[async_trait]
impl PricingSource for EmptyPricingSource {
    async fn fetch(&self) -> Result<PricingTable> {
        Ok(PricingTable::new())
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_pricing_blob() {
        let table = parse_pricing_blob(
            r#"{
                "gpt-4o-mini": {"input_per_1k_usd": 0.00015, "output_per_1k_usd": 0.0006},
                "gpt-4": {"input_per_1k_usd": 0.03, "output_per_1k_usd": 0.06}
            }"#,
        )
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table["gpt-4"], ModelPricing::new(0.03, 0.06));
    }

    #[test]
    fn test_parse_skips_bad_entries() {
        let table = parse_pricing_blob(
            r#"{
                "good": {"input_per_1k_usd": 0.01, "output_per_1k_usd": 0.02},
                "negative": {"input_per_1k_usd": -1.0, "output_per_1k_usd": 0.02},
                "partial": {"input_per_1k_usd": 0.01},
                "wrong": "free"
            }"#,
        )
        .unwrap();

        assert_eq!(table.len(), 1);
        assert!(table.contains_key("good"));
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(matches!(
            parse_pricing_blob("[1, 2, 3]"),
            Err(ProxyError::PricingUnavailable { .. })
        ));
        assert!(parse_pricing_blob("not json").is_err());
    }

    #[tokio::test]
    async fn test_file_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"claude-3-haiku": {{"input_per_1k_usd": 0.00025, "output_per_1k_usd": 0.00125}}}}"#
        )
        .unwrap();

        let source = FilePricingSource::new(file.path());
        let table = source.fetch().await.unwrap();
        assert_eq!(table["claude-3-haiku"], ModelPricing::new(0.00025, 0.00125));
    }

    #[tokio::test]
    async fn test_bundled_pricing_file() {
        let table = FilePricingSource::new("config/pricing.json").fetch().await.unwrap();
        assert_eq!(table["gpt-4o-mini"], ModelPricing::new(0.00015, 0.0006));
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let source = FilePricingSource::new("/no/such/pricing.json");
        assert!(source.fetch().await.is_err());
    }

    #[tokio::test]
    async fn test_refused_redis_fails_fast() {
        let source = RedisPricingSource::new("redis://127.0.0.1:1", "PRICING_V1")
            .unwrap()
            .with_timeout(Duration::from_millis(200));

        let result = tokio::time::timeout(Duration::from_secs(10), source.fetch())
            .await
            .expect("connection attempts must be bounded");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_invalid_redis_url_is_config_error() {
        let result = RedisPricingSource::new("not a url", "PRICING_V1");
        assert!(matches!(result, Err(ProxyError::Config { .. })));
    }
}
