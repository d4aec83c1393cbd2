//! # 配置管理模块
//!
//! 处理应用配置加载、环境变量覆盖和验证

mod app_config;
mod database;
mod manager;

pub use app_config::{
    AppConfig, BillingConfig, PricingConfig, PricingSourceKind, ServerConfig, UpstreamConfig,
    UpstreamMode,
};
pub use database::DatabaseConfig;
pub use manager::ConfigManager;
