//! # 应用配置结构定义

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::{FeeRate, TimeoutSeconds};

/// 应用主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP服务配置
    pub server: ServerConfig,
    /// 数据库配置
    pub database: super::DatabaseConfig,
    /// 计费配置
    pub billing: BillingConfig,
    /// 定价缓存与批量定价源配置
    pub pricing: PricingConfig,
    /// 上游聊天服务配置
    pub upstream: UpstreamConfig,
}

/// HTTP服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址
    pub bind_address: String,
    /// 监听端口
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8787,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// 计费配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// 平台费率（基础费用的比例）
    pub fee_rate: f64,
    /// 未提供 `session` 参数时使用的会话ID
    pub default_session: String,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            fee_rate: FeeRate::DEFAULT.as_f64(),
            default_session: "default".to_string(),
        }
    }
}

impl BillingConfig {
    /// 校验后的费率；非法值回退到默认费率
    #[must_use]
    pub fn fee_rate(&self) -> FeeRate {
        FeeRate::new(self.fee_rate).unwrap_or_default()
    }
}

/// 批量定价来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingSourceKind {
    /// Redis 键值存储
    Redis,
    /// 本地JSON文件
    File,
    /// 不使用批量定价，只依赖覆盖表
    #[default]
    None,
}

/// 定价配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// 批量定价表缓存时间（秒）
    pub cache_ttl_seconds: u64,
    /// 单次拉取批量定价表的超时（秒）
    pub fetch_timeout_seconds: u64,
    /// 拉取失败后空表的保留时间（秒），0 表示下一次读取立即重试
    pub failure_retry_seconds: u64,
    /// 批量定价来源
    pub source: PricingSourceKind,
    /// Redis连接URL
    pub redis_url: Option<String>,
    /// 批量定价JSON所在的键
    pub blob_key: String,
    /// 文件来源路径
    pub file_path: Option<String>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: 300,
            fetch_timeout_seconds: 2,
            failure_retry_seconds: 5,
            source: PricingSourceKind::default(),
            redis_url: None,
            blob_key: "PRICING_V1".to_string(),
            file_path: None,
        }
    }
}

impl PricingConfig {
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }

    #[must_use]
    pub const fn failure_retry(&self) -> Duration {
        Duration::from_secs(self.failure_retry_seconds)
    }
}

/// 上游模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamMode {
    /// 转发到真实的聊天补全服务
    Forward,
    /// 本地生成模拟回复
    #[default]
    Simulate,
}

/// 上游聊天服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub mode: UpstreamMode,
    /// 上游基础URL，例如 `https://api.openai.com/v1`
    pub base_url: Option<String>,
    /// 访问上游使用的密钥
    pub api_key: Option<String>,
    /// 单次转发超时（秒）
    pub timeout_seconds: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            mode: UpstreamMode::Simulate,
            base_url: None,
            api_key: None,
            timeout_seconds: 60,
        }
    }
}

impl UpstreamConfig {
    #[must_use]
    pub const fn timeout(&self) -> TimeoutSeconds {
        TimeoutSeconds::new(self.timeout_seconds)
    }
}

impl AppConfig {
    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), String> {
        if FeeRate::new(self.billing.fee_rate).is_none() {
            return Err(format!(
                "billing.fee_rate must be a finite non-negative fraction, got {}",
                self.billing.fee_rate
            ));
        }
        if self.billing.default_session.is_empty() {
            return Err("billing.default_session cannot be empty".to_string());
        }

        if self.pricing.cache_ttl_seconds == 0 {
            return Err("pricing.cache_ttl_seconds must be greater than 0".to_string());
        }
        if self.pricing.fetch_timeout_seconds == 0 {
            return Err("pricing.fetch_timeout_seconds must be greater than 0".to_string());
        }
        match self.pricing.source {
            PricingSourceKind::Redis => {
                if self.pricing.redis_url.as_deref().is_none_or(str::is_empty) {
                    return Err("pricing.redis_url is required when source = \"redis\"".to_string());
                }
            }
            PricingSourceKind::File => {
                if self.pricing.file_path.as_deref().is_none_or(str::is_empty) {
                    return Err("pricing.file_path is required when source = \"file\"".to_string());
                }
            }
            PricingSourceKind::None => {}
        }

        if self.database.url.is_empty() {
            return Err("Database URL cannot be empty".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }

        if self.upstream.mode == UpstreamMode::Forward
            && self.upstream.base_url.as_deref().is_none_or(str::is_empty)
        {
            return Err("upstream.base_url is required when mode = \"forward\"".to_string());
        }
        if self.upstream.timeout_seconds == 0 {
            return Err("upstream.timeout_seconds must be greater than 0".to_string());
        }

        Ok(())
    }
}
