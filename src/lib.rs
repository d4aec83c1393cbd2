//! # Sandbox Billing Proxy
//!
//! 计费感知的聊天补全反向代理：认证调用方、转发或模拟聊天请求、
//! 计算平台费用并写入用量账本

pub mod app;
pub mod auth;
pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod pricing;
pub mod proxy;
pub mod types;
pub mod usage;

// Re-export commonly used types
pub use app::AppContext;
pub use config::AppConfig;
pub use error::{ProxyError, Result};
