//! # 错误类型定义

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use super::ErrorCategory;

/// 应用主要错误类型
///
/// 认证、请求校验、上游转发三类错误会终止请求并返回给调用方；
/// 定价与用量记录错误只在内部记录日志，不会出现在响应中。
#[derive(Debug, Error)]
pub enum ProxyError {
    /// 请求未携带API密钥
    #[error("Missing API key. Provide `Authorization: Bearer <key>` or `X-Eliza-Cloud-Key: <key>`")]
    MissingCredential,

    /// API密钥不在白名单中
    #[error("Invalid API key")]
    InvalidCredential,

    /// 密钥存储不可达
    #[error("Authentication is temporarily unavailable: {message}")]
    AuthenticationUnavailable {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 请求体不是合法的聊天请求
    #[error("Malformed request body: {message}")]
    MalformedRequestBody { message: String },

    /// 消息数组结构错误
    #[error("Invalid message at index {index}: {message}")]
    InvalidMessageStructure { message: String, index: usize },

    /// 请求方法不被允许
    #[error("Method {method} is not allowed")]
    MethodNotAllowed { method: String },

    /// 上游返回了错误响应
    #[error("Upstream returned an error: {message}")]
    UpstreamError {
        message: String,
        status: Option<u16>,
    },

    /// 上游网络不可达或超时
    #[error("Upstream is unreachable: {message}")]
    UpstreamUnreachable {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 定价数据不可用（内部降级）
    #[error("定价数据不可用: {message}")]
    PricingUnavailable {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 用量记录失败（仅记录日志）
    #[error("用量记录失败: {message}")]
    RecordingFailure {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 配置相关错误
    #[error("配置错误: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 数据库相关错误
    #[error("数据库错误: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 缓存相关错误
    #[error("缓存错误: {message}")]
    Cache {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 序列化/反序列化错误
    #[error("序列化错误: {message}")]
    Serialization {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    /// IO相关错误
    #[error("IO错误: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// 系统内部错误
    #[error("内部错误: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 附加了上下文的错误
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<ProxyError>,
    },
}

impl ProxyError {
    /// 将错误转换为HTTP状态码、错误类型和错误代码
    #[must_use]
    pub fn to_http_response_parts(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            Self::MissingCredential => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "missing_credential",
            ),
            Self::InvalidCredential => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "invalid_credential",
            ),
            Self::AuthenticationUnavailable { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "authentication_error",
                "authentication_unavailable",
            ),
            Self::MalformedRequestBody { .. } => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "malformed_request_body",
            ),
            Self::InvalidMessageStructure { .. } => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "invalid_message_structure",
            ),
            Self::MethodNotAllowed { .. } => (
                StatusCode::METHOD_NOT_ALLOWED,
                "invalid_request_error",
                "method_not_allowed",
            ),
            Self::UpstreamError { .. } => {
                (StatusCode::BAD_GATEWAY, "upstream_error", "upstream_error")
            }
            Self::UpstreamUnreachable { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "upstream_error",
                "upstream_unreachable",
            ),
            Self::PricingUnavailable { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "pricing_unavailable",
            ),
            Self::RecordingFailure { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "recording_failure",
            ),
            Self::Config { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "config_error",
            ),
            Self::Database { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "database_error",
            ),
            Self::Cache { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "cache_error",
            ),
            Self::Serialization { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "serialization_error",
            ),
            Self::Io { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "io_error"),
            Self::Internal { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal_error",
            ),
            Self::Context { source, .. } => source.to_http_response_parts(),
        }
    }

    /// 错误分类（客户端/服务端）
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        if self.to_http_response_parts().0.is_client_error() {
            ErrorCategory::Client
        } else {
            ErrorCategory::Server
        }
    }

    /// 创建带来源的认证不可用错误
    pub fn authentication_unavailable<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::AuthenticationUnavailable {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建请求体格式错误
    pub fn malformed_body<T: Into<String>>(message: T) -> Self {
        Self::MalformedRequestBody {
            message: message.into(),
        }
    }

    /// 创建消息结构错误
    pub fn invalid_message<T: Into<String>>(index: usize, message: T) -> Self {
        Self::InvalidMessageStructure {
            message: message.into(),
            index,
        }
    }

    /// 创建上游错误响应
    pub fn upstream_error<T: Into<String>>(message: T, status: Option<u16>) -> Self {
        Self::UpstreamError {
            message: message.into(),
            status,
        }
    }

    /// 创建上游不可达错误
    pub fn upstream_unreachable<T: Into<String>>(message: T) -> Self {
        Self::UpstreamUnreachable {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的上游不可达错误
    pub fn upstream_unreachable_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::UpstreamUnreachable {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建定价不可用错误
    pub fn pricing_unavailable<T: Into<String>>(message: T) -> Self {
        Self::PricingUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的定价不可用错误
    pub fn pricing_unavailable_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::PricingUnavailable {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建带来源的用量记录错误
    pub fn recording_failure_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::RecordingFailure {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建配置错误
    pub fn config<T: Into<String>>(message: T) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的配置错误
    pub fn config_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建带来源的数据库错误
    pub fn database_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Database {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建带来源的缓存错误
    pub fn cache_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Cache {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建内部错误
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的内部错误
    pub fn internal_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, error_type, code) = self.to_http_response_parts();
        let body = json!({
            "error": {
                "message": self.to_string(),
                "type": error_type,
                "code": code,
            }
        });
        (status, Json(body)).into_response()
    }
}

// 自动转换常见错误类型
impl From<std::io::Error> for ProxyError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: "文件操作失败".to_string(),
            source: err,
        }
    }
}

impl From<toml::de::Error> for ProxyError {
    fn from(err: toml::de::Error) -> Self {
        Self::config_with_source("TOML解析失败", err)
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: "JSON处理失败".to_string(),
            source: err.into(),
        }
    }
}

impl From<sea_orm::error::DbErr> for ProxyError {
    fn from(err: sea_orm::error::DbErr) -> Self {
        Self::database_with_source("数据库操作失败", err)
    }
}

impl From<redis::RedisError> for ProxyError {
    fn from(err: redis::RedisError) -> Self {
        Self::cache_with_source("Redis操作失败", err)
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        Self::upstream_unreachable_with_source("HTTP请求失败", err)
    }
}
