//! # 上游聊天服务
//!
//! 上游返回非 2xx 视为 `UpstreamError`（502），网络错误或超时视为
//! `UpstreamUnreachable`（503）。

use async_trait::async_trait;
use serde_json::Value;
use std::time::Instant;

use super::types::{ChatCompletion, ChatRequest, extract_usage};
use crate::error::{ProxyError, Result};
use crate::logging::{LogComponent, LogStage, mask_secret};
use crate::types::TimeoutSeconds;
use crate::{ldebug, lwarn};

/// 聊天补全后端
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, request: &ChatRequest, request_id: &str) -> Result<ChatCompletion>;

    /// 后端名称（日志）
    fn name(&self) -> &'static str;
}

/// 通过 HTTP 转发到 OpenAI 兼容的上游
#[derive(Debug, Clone)]
pub struct HttpChatBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpChatBackend {
    /// `base_url` 形如 `https://api.openai.com/v1`，请求发往 `{base_url}/chat/completions`
    pub fn new(base_url: &str, api_key: Option<String>, timeout: TimeoutSeconds) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout.as_duration())
            .build()
            .map_err(|e| ProxyError::config_with_source("创建上游HTTP客户端失败", e))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn complete(&self, request: &ChatRequest, request_id: &str) -> Result<ChatCompletion> {
        ldebug!(
            request_id,
            LogStage::Upstream,
            LogComponent::Upstream,
            "upstream_request",
            "Forwarding chat request",
            endpoint = %self.endpoint,
            model = %request.model,
            api_key = %self.api_key.as_deref().map(mask_secret).unwrap_or_default(),
        );

        let started = Instant::now();
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            lwarn!(
                request_id,
                LogStage::Upstream,
                LogComponent::Upstream,
                "upstream_unreachable",
                "Upstream request failed",
                timeout = e.is_timeout(),
                error = %e,
            );
            ProxyError::upstream_unreachable_with_source(
                if e.is_timeout() {
                    "upstream request timed out"
                } else {
                    "upstream request failed"
                },
                e,
            )
        })?;

        let status = response.status();
        let text = response.text().await?;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        if !status.is_success() {
            lwarn!(
                request_id,
                LogStage::Upstream,
                LogComponent::Upstream,
                "upstream_error_status",
                "Upstream returned non-success status",
                status = status.as_u16(),
                latency_ms = latency_ms,
            );
            let detail: String = text.chars().take(512).collect();
            return Err(ProxyError::upstream_error(
                format!("status {}: {detail}", status.as_u16()),
                Some(status.as_u16()),
            ));
        }

        let body: Value = serde_json::from_str(&text).map_err(|e| {
            ProxyError::upstream_error(format!("upstream body is not valid JSON: {e}"), None)
        })?;

        ldebug!(
            request_id,
            LogStage::Upstream,
            LogComponent::Upstream,
            "upstream_response",
            "Upstream responded",
            status = status.as_u16(),
            latency_ms = latency_ms,
        );

        Ok(ChatCompletion {
            usage: extract_usage(&body),
            body,
            simulated: false,
            latency_ms,
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::types::ChatMessage;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ChatRequest {
        ChatRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![ChatMessage::text("user", "hi")],
            max_tokens: None,
            temperature: None,
            extra: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn test_forwards_and_reads_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-upstream-secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "choices": [{"message": {"role": "assistant", "content": "hello"}}],
                "usage": {"prompt_tokens": 100, "completion_tokens": 200}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = HttpChatBackend::new(
            &format!("{}/v1/", server.uri()),
            Some("sk-upstream-secret".to_string()),
            TimeoutSeconds::new(5),
        )
        .unwrap();

        let completion = backend.complete(&request(), "req-1").await.unwrap();
        assert_eq!(completion.usage.map(|u| u.total()), Some(300));
        assert!(!completion.simulated);
        assert_eq!(completion.body["id"], "chatcmpl-1");
    }

    #[tokio::test]
    async fn test_non_success_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let backend = HttpChatBackend::new(&server.uri(), None, TimeoutSeconds::new(5)).unwrap();
        let err = backend.complete(&request(), "req-2").await.unwrap_err();
        assert!(matches!(err, ProxyError::UpstreamError { status: Some(500), .. }));
    }

    #[tokio::test]
    async fn test_timeout_is_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(std::time::Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let backend = HttpChatBackend::new(&server.uri(), None, TimeoutSeconds::new(1)).unwrap();
        let err = backend.complete(&request(), "req-3").await.unwrap_err();
        assert!(matches!(err, ProxyError::UpstreamUnreachable { .. }));
    }

    #[tokio::test]
    async fn test_connection_refused_is_unreachable() {
        let backend =
            HttpChatBackend::new("http://127.0.0.1:9", None, TimeoutSeconds::new(1)).unwrap();
        let err = backend.complete(&request(), "req-4").await.unwrap_err();
        assert!(matches!(err, ProxyError::UpstreamUnreachable { .. }));
    }
}
