//! # 用量事件

use entity::usage_events;
use sea_orm::ActiveValue::Set;
use serde::Serialize;

use crate::pricing::FeeCalculation;
use crate::types::{TokenCount, UnixTimestamp};

/// 上游报告的 token 用量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub prompt_tokens: TokenCount,
    pub completion_tokens: TokenCount,
}

impl TokenUsage {
    #[must_use]
    pub const fn new(prompt_tokens: TokenCount, completion_tokens: TokenCount) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    #[must_use]
    pub const fn total(&self) -> TokenCount {
        self.prompt_tokens + self.completion_tokens
    }
}

/// 随事件存储的请求元数据
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageMetadata {
    pub message_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    pub simulated: bool,
    pub upstream_latency_ms: u64,
    pub fee_rate: f64,
    pub pricing_found: bool,
}

impl UsageMetadata {
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// 待写入的用量事件
#[derive(Debug, Clone, PartialEq)]
pub struct UsageEvent {
    /// 同时作为主键与 `request_id`
    pub id: String,
    pub ts: UnixTimestamp,
    pub cloud_key_id: String,
    pub session_id: Option<String>,
    pub model: Option<String>,
    pub usage: Option<TokenUsage>,
    pub fee: Option<FeeCalculation>,
    pub request_id: String,
    /// 已序列化的元数据 JSON
    pub meta: String,
}

impl UsageEvent {
    /// 转换为数据库模型
    #[must_use]
    pub fn to_active_model(&self) -> usage_events::ActiveModel {
        usage_events::ActiveModel {
            id: Set(self.id.clone()),
            ts: Set(self.ts),
            cloud_key_id: Set(self.cloud_key_id.clone()),
            session_id: Set(self.session_id.clone()),
            model: Set(self.model.clone()),
            prompt_tokens: Set(self.usage.map(|u| to_db_count(u.prompt_tokens))),
            completion_tokens: Set(self.usage.map(|u| to_db_count(u.completion_tokens))),
            base_cost_usd: Set(self.fee.map(|f| f.base_cost_usd)),
            platform_fee_usd: Set(self.fee.map(|f| f.platform_fee_usd)),
            total_cost_usd: Set(self.fee.map(|f| f.total_cost_usd)),
            request_id: Set(self.request_id.clone()),
            meta: Set(self.meta.clone()),
        }
    }
}

fn to_db_count(count: TokenCount) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_metadata_skips_absent_fields() {
        let meta = UsageMetadata {
            message_count: 2,
            simulated: true,
            fee_rate: 0.2,
            ..Default::default()
        };
        let json = meta.to_json();
        assert_eq!(json["message_count"], 2);
        assert!(json.get("max_tokens").is_none());
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_active_model_without_usage() {
        let event = UsageEvent {
            id: "req-1".to_string(),
            ts: 1_700_000_000,
            cloud_key_id: "key_1".to_string(),
            session_id: None,
            model: Some("gpt-4".to_string()),
            usage: None,
            fee: None,
            request_id: "req-1".to_string(),
            meta: "{}".to_string(),
        };
        let model = event.to_active_model();
        assert_eq!(model.prompt_tokens, Set(None));
        assert_eq!(model.total_cost_usd, Set(None));
        assert_eq!(model.request_id, Set("req-1".to_string()));
    }
}
