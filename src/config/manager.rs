//! # 配置管理器
//!
//! 统一的配置加载入口：配置文件 + 环境变量覆盖 + 校验

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{AppConfig, PricingSourceKind, UpstreamMode};
use crate::error::{ProxyError, Result};

/// 环境变量覆盖前缀，例如 `BILLING_SERVER_PORT`
const ENV_PREFIX: &str = "BILLING_";

/// 配置管理器
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// 当前配置
    config: Arc<AppConfig>,
    /// 配置文件路径（使用内置默认值时为空）
    source_path: Option<PathBuf>,
}

impl ConfigManager {
    /// 创建配置管理器
    ///
    /// 查找顺序：显式路径 → `BILLING_PROXY_CONFIG_PATH` → `config/config.{RUST_ENV}.toml` → 内置默认值
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        if let Ok(path) = env::var("BILLING_PROXY_CONFIG_PATH") {
            return Self::from_file(path);
        }

        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        let default_file = PathBuf::from(format!("config/config.{env_name}.toml"));
        if default_file.exists() {
            return Self::from_file(default_file);
        }

        warn!(
            "配置文件 {} 不存在，使用内置默认配置",
            default_file.display()
        );
        Self::from_config(AppConfig::default(), None)
    }

    /// 从指定文件创建配置管理器
    pub fn from_file(config_path: impl AsRef<Path>) -> Result<Self> {
        let config_path = config_path.as_ref();
        let config = Self::load_config_file(config_path)?;
        Self::from_config(config, Some(config_path.to_path_buf()))
    }

    /// 应用环境变量覆盖并校验
    pub fn from_config(mut config: AppConfig, source_path: Option<PathBuf>) -> Result<Self> {
        let env_overrides = Self::build_env_overrides();
        Self::apply_env_overrides(&mut config, &env_overrides)?;

        config.validate().map_err(ProxyError::config)?;

        info!("配置管理器初始化完成");
        info!(
            "- 配置来源: {}",
            source_path
                .as_ref()
                .map_or_else(|| "内置默认值".to_string(), |p| p.display().to_string())
        );
        info!("- 环境变量覆盖: {} 个", env_overrides.len());

        Ok(Self {
            config: Arc::new(config),
            source_path,
        })
    }

    /// 获取当前配置
    #[must_use]
    pub fn get_config(&self) -> Arc<AppConfig> {
        Arc::clone(&self.config)
    }

    /// 配置文件路径
    #[must_use]
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// 加载配置文件
    fn load_config_file(path: &Path) -> Result<AppConfig> {
        if !path.exists() {
            return Err(ProxyError::config(format!(
                "配置文件不存在: {}",
                path.display()
            )));
        }

        let config_content = std::fs::read_to_string(path).map_err(|e| {
            ProxyError::config_with_source(format!("读取配置文件失败: {}", path.display()), e)
        })?;

        toml::from_str(&config_content).map_err(|e| {
            ProxyError::config_with_source(
                format!("TOML解析失败 - 配置文件: {}, 详细错误: {e}", path.display()),
                e,
            )
        })
    }

    /// 构建环境变量覆盖映射
    fn build_env_overrides() -> HashMap<String, String> {
        let overrides: HashMap<String, String> = env::vars()
            .filter(|(key, _)| key != "BILLING_PROXY_CONFIG_PATH")
            .filter_map(|(key, value)| {
                key.strip_prefix(ENV_PREFIX)
                    .map(|config_key| (config_key.to_lowercase(), value))
            })
            .collect();

        debug!("发现 {} 个环境变量覆盖", overrides.len());
        overrides
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(
        config: &mut AppConfig,
        overrides: &HashMap<String, String>,
    ) -> Result<()> {
        for (key, value) in overrides {
            debug!(
                "应用环境变量覆盖: {} = {}",
                key,
                if key.contains("key") || key.contains("secret") {
                    "***"
                } else {
                    value
                }
            );

            Self::apply_override_to_config(config, key, value)?;
        }
        Ok(())
    }

    /// 将单个覆盖项应用到配置对象
    fn apply_override_to_config(config: &mut AppConfig, key: &str, value: &str) -> Result<()> {
        match key {
            "server_bind_address" => config.server.bind_address = value.to_string(),
            "server_port" => config.server.port = parse_value(key, value)?,
            "database_url" => config.database.url = value.to_string(),
            "database_max_connections" => {
                config.database.max_connections = parse_value(key, value)?;
            }
            "billing_fee_rate" => config.billing.fee_rate = parse_value(key, value)?,
            "billing_default_session" => config.billing.default_session = value.to_string(),
            "pricing_cache_ttl_seconds" => {
                config.pricing.cache_ttl_seconds = parse_value(key, value)?;
            }
            "pricing_fetch_timeout_seconds" => {
                config.pricing.fetch_timeout_seconds = parse_value(key, value)?;
            }
            "pricing_failure_retry_seconds" => {
                config.pricing.failure_retry_seconds = parse_value(key, value)?;
            }
            "pricing_source" => {
                config.pricing.source = match value.to_lowercase().as_str() {
                    "redis" => PricingSourceKind::Redis,
                    "file" => PricingSourceKind::File,
                    "none" => PricingSourceKind::None,
                    other => {
                        return Err(ProxyError::config(format!("未知的定价来源: {other}")));
                    }
                };
            }
            "pricing_redis_url" => config.pricing.redis_url = Some(value.to_string()),
            "pricing_blob_key" => config.pricing.blob_key = value.to_string(),
            "pricing_file_path" => config.pricing.file_path = Some(value.to_string()),
            "upstream_mode" => {
                config.upstream.mode = match value.to_lowercase().as_str() {
                    "forward" => UpstreamMode::Forward,
                    "simulate" => UpstreamMode::Simulate,
                    other => {
                        return Err(ProxyError::config(format!("未知的上游模式: {other}")));
                    }
                };
            }
            "upstream_base_url" => config.upstream.base_url = Some(value.to_string()),
            "upstream_api_key" => config.upstream.api_key = Some(value.to_string()),
            "upstream_timeout_seconds" => {
                config.upstream.timeout_seconds = parse_value(key, value)?;
            }
            _ => {
                warn!("未知的配置项，忽略环境变量覆盖: {}{}", ENV_PREFIX, key.to_uppercase());
            }
        }

        Ok(())
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse().map_err(|e| {
        ProxyError::config_with_source(format!("无效的配置值 {key}={value}"), e)
    })
}
