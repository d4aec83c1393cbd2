//! # API密钥校验
//!
//! 对出示的密钥做白名单精确匹配。密钥以明文存储并按字符串相等比较，
//! 存储层不可达时返回 `AuthenticationUnavailable`，不会导致进程崩溃。

use async_trait::async_trait;
use axum::http::HeaderMap;
use entity::cloud_api_keys::{self, Entity as CloudApiKeys};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::sync::Arc;

use super::header_parser::AuthHeaderParser;
use crate::error::{ProxyError, Result};
use crate::logging::{LogComponent, LogStage, mask_secret};
use crate::{ldebug, lwarn};

/// 白名单中的API密钥记录
pub type ApiKeyRecord = cloud_api_keys::Model;

/// 密钥存储访问接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// 按密钥精确查找
    async fn find_by_key(&self, key: &str) -> Result<Option<ApiKeyRecord>>;
}

/// 基于数据库 `cloud_api_keys` 表的密钥存储
#[derive(Debug, Clone)]
pub struct DbCredentialStore {
    db: Arc<DatabaseConnection>,
}

impl DbCredentialStore {
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for DbCredentialStore {
    async fn find_by_key(&self, key: &str) -> Result<Option<ApiKeyRecord>> {
        let record = CloudApiKeys::find()
            .filter(cloud_api_keys::Column::Key.eq(key))
            .one(&*self.db)
            .await?;
        Ok(record)
    }
}

/// 认证通过的调用方
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedKey {
    /// `cloud_api_keys.id`
    pub key_id: String,
    pub label: Option<String>,
    /// 脱敏后的密钥，用于日志
    pub key_preview: String,
}

/// `{valid, key_id, error}` 形式的校验结果
#[derive(Debug)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub key_id: Option<String>,
    pub error: Option<ProxyError>,
}

impl From<Result<AuthenticatedKey>> for ValidationOutcome {
    fn from(result: Result<AuthenticatedKey>) -> Self {
        match result {
            Ok(key) => Self {
                valid: true,
                key_id: Some(key.key_id),
                error: None,
            },
            Err(error) => Self {
                valid: false,
                key_id: None,
                error: Some(error),
            },
        }
    }
}

/// API密钥校验器
#[derive(Clone)]
pub struct ApiKeyValidator {
    store: Arc<dyn CredentialStore>,
}

impl ApiKeyValidator {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// 从请求头提取密钥并校验
    pub async fn authenticate(
        &self,
        headers: &HeaderMap,
        request_id: &str,
    ) -> Result<AuthenticatedKey> {
        let presented = AuthHeaderParser::extract_presented_key(headers);
        self.validate(presented.as_deref(), request_id).await
    }

    /// 校验出示的密钥
    pub async fn validate(
        &self,
        presented_key: Option<&str>,
        request_id: &str,
    ) -> Result<AuthenticatedKey> {
        let Some(key) = presented_key.filter(|k| !k.is_empty()) else {
            ldebug!(
                request_id,
                LogStage::Authentication,
                LogComponent::Auth,
                "credential_missing",
                "No API key presented"
            );
            return Err(ProxyError::MissingCredential);
        };

        let key_preview = mask_secret(key);

        let record = self.store.find_by_key(key).await.map_err(|e| {
            lwarn!(
                request_id,
                LogStage::Authentication,
                LogComponent::Auth,
                "credential_lookup_failed",
                "Credential store lookup failed",
                key_preview = %key_preview,
                error = %e,
            );
            ProxyError::authentication_unavailable("credential store lookup failed", e)
        })?;

        match record {
            Some(record) if record.key == key => {
                ldebug!(
                    request_id,
                    LogStage::Authentication,
                    LogComponent::Auth,
                    "credential_valid",
                    "API key accepted",
                    key_id = %record.id,
                    key_preview = %key_preview,
                );
                Ok(AuthenticatedKey {
                    key_id: record.id,
                    label: record.label,
                    key_preview,
                })
            }
            _ => {
                lwarn!(
                    request_id,
                    LogStage::Authentication,
                    LogComponent::Auth,
                    "credential_invalid",
                    "API key not in allow-list",
                    key_preview = %key_preview,
                );
                Err(ProxyError::InvalidCredential)
            }
        }
    }

    /// 以 `{valid, key_id, error}` 结构返回校验结果
    pub async fn validate_outcome(
        &self,
        presented_key: Option<&str>,
        request_id: &str,
    ) -> ValidationOutcome {
        self.validate(presented_key, request_id).await.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(id: &str, key: &str) -> ApiKeyRecord {
        ApiKeyRecord {
            id: id.to_string(),
            key: key.to_string(),
            label: Some("test".to_string()),
            created_at: 1_700_000_000,
        }
    }

    #[tokio::test]
    async fn test_missing_key_skips_lookup() {
        let mut store = MockCredentialStore::new();
        store.expect_find_by_key().never();
        let validator = ApiKeyValidator::new(Arc::new(store));

        let result = validator.validate(None, "req-1").await;
        assert!(matches!(result, Err(ProxyError::MissingCredential)));

        let result = validator.validate(Some(""), "req-1").await;
        assert!(matches!(result, Err(ProxyError::MissingCredential)));
    }

    #[tokio::test]
    async fn test_unknown_key_is_invalid() {
        let mut store = MockCredentialStore::new();
        store.expect_find_by_key().returning(|_| Ok(None));
        let validator = ApiKeyValidator::new(Arc::new(store));

        let outcome = validator.validate_outcome(Some("sk-unknown"), "req-2").await;
        assert!(!outcome.valid);
        assert!(outcome.key_id.is_none());
        assert!(matches!(outcome.error, Some(ProxyError::InvalidCredential)));
    }

    #[tokio::test]
    async fn test_known_key_returns_key_id() {
        let mut store = MockCredentialStore::new();
        store
            .expect_find_by_key()
            .withf(|key| key == "sk-cloud-valid-key")
            .returning(|key| Ok(Some(record("key_42", key))));
        let validator = ApiKeyValidator::new(Arc::new(store));

        let outcome = validator
            .validate_outcome(Some("sk-cloud-valid-key"), "req-3")
            .await;
        assert!(outcome.valid);
        assert_eq!(outcome.key_id.as_deref(), Some("key_42"));
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn test_store_failure_is_unavailable() {
        let mut store = MockCredentialStore::new();
        store
            .expect_find_by_key()
            .returning(|_| Err(ProxyError::internal("store unreachable")));
        let validator = ApiKeyValidator::new(Arc::new(store));

        let result = validator.validate(Some("sk-anything-long"), "req-4").await;
        assert!(matches!(
            result,
            Err(ProxyError::AuthenticationUnavailable { .. })
        ));
    }
}
