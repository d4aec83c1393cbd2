//! # 日志配置模块
//!
//! 统一的结构化日志：每条日志都带有请求ID、阶段和组件，便于按请求串联排查

use std::env;
use std::fmt;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// 请求处理阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStage {
    Startup,
    Shutdown,
    Authentication,
    Validation,
    Upstream,
    Pricing,
    Cache,
    Recording,
    Response,
}

impl LogStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Shutdown => "shutdown",
            Self::Authentication => "authentication",
            Self::Validation => "validation",
            Self::Upstream => "upstream",
            Self::Pricing => "pricing",
            Self::Cache => "cache",
            Self::Recording => "recording",
            Self::Response => "response",
        }
    }
}

impl fmt::Display for LogStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 产生日志的组件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogComponent {
    Main,
    Database,
    ServerSetup,
    Auth,
    PricingResolver,
    PricingSource,
    FeeCalculator,
    UsageRecorder,
    Upstream,
    Simulator,
    Pipeline,
    Handler,
}

impl LogComponent {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Database => "database",
            Self::ServerSetup => "server_setup",
            Self::Auth => "auth",
            Self::PricingResolver => "pricing_resolver",
            Self::PricingSource => "pricing_source",
            Self::FeeCalculator => "fee_calculator",
            Self::UsageRecorder => "usage_recorder",
            Self::Upstream => "upstream",
            Self::Simulator => "simulator",
            Self::Pipeline => "pipeline",
            Self::Handler => "handler",
        }
    }
}

impl fmt::Display for LogComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 结构化 info 日志
///
/// `linfo!(request_id, stage, component, operation, message, key = value, ...)`
#[macro_export]
macro_rules! linfo {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(,)?) => {
        ::tracing::info!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            message = %$message
        )
    };
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr, $($fields:tt)+) => {
        ::tracing::info!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            message = %$message,
            $($fields)+
        )
    };
}

/// 结构化 debug 日志
#[macro_export]
macro_rules! ldebug {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(,)?) => {
        ::tracing::debug!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            message = %$message
        )
    };
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr, $($fields:tt)+) => {
        ::tracing::debug!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            message = %$message,
            $($fields)+
        )
    };
}

/// 结构化 warn 日志
#[macro_export]
macro_rules! lwarn {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(,)?) => {
        ::tracing::warn!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            message = %$message
        )
    };
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr, $($fields:tt)+) => {
        ::tracing::warn!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            message = %$message,
            $($fields)+
        )
    };
}

/// 结构化 error 日志
#[macro_export]
macro_rules! lerror {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(,)?) => {
        ::tracing::error!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            message = %$message
        )
    };
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr, $($fields:tt)+) => {
        ::tracing::error!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            message = %$message,
            $($fields)+
        )
    };
}

/// 密钥脱敏预览，仅保留首尾各4个字符
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}****{tail}")
}

/// 初始化优化的日志系统
pub fn init_optimized_logging(log_level: Option<&String>) {
    let level = log_level.map_or("info", std::string::String::as_str);

    // 默认关闭 SQL 详细日志
    let default_filter = format!(
        "{level},sqlx::query=off,sea_orm::query=warn,sqlx=warn"
    );

    let log_filter = env::var("RUST_LOG").unwrap_or(default_filter);

    let result = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| log_filter.into()))
        .with(
            tracing_fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();

    if result.is_err() {
        tracing::debug!("tracing subscriber already initialised");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("sk-abcdefghijkl"), "sk-a****ijkl");
        assert_eq!(mask_secret("short"), "****");
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(LogStage::Pricing.to_string(), "pricing");
        assert_eq!(LogComponent::UsageRecorder.to_string(), "usage_recorder");
    }
}
