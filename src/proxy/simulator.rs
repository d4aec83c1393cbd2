//! # 模拟上游
//!
//! 不访问网络，生成固定格式的补全响应。token 数按每 4 个字符 1 个估算，
//! 每条非空消息至少 1 个。

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use super::backend::ChatBackend;
use super::types::{ChatCompletion, ChatMessage, ChatRequest};
use crate::clock::Clock;
use crate::error::Result;
use crate::ldebug;
use crate::logging::{LogComponent, LogStage};
use crate::types::TokenCount;
use crate::usage::TokenUsage;

const CHARS_PER_TOKEN: usize = 4;

/// 估算一段文本的 token 数
#[must_use]
pub fn estimate_tokens(chars: usize) -> TokenCount {
    TokenCount::try_from(chars.div_ceil(CHARS_PER_TOKEN)).unwrap_or(TokenCount::MAX)
}

fn message_tokens(message: &ChatMessage) -> TokenCount {
    match message.content_chars() {
        0 => 0,
        chars => estimate_tokens(chars).max(1),
    }
}

/// 本地模拟后端；`created` 取自注入的时钟
#[derive(Clone)]
pub struct SimulatedChatBackend {
    clock: Arc<dyn Clock>,
}

impl SimulatedChatBackend {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    fn reply_for(request: &ChatRequest) -> String {
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map_or(0, ChatMessage::content_chars);
        format!(
            "[simulated {}] Received {} message(s); last user message had {} characters.",
            request.model,
            request.messages.len(),
            last_user
        )
    }
}

#[async_trait]
impl ChatBackend for SimulatedChatBackend {
    async fn complete(&self, request: &ChatRequest, request_id: &str) -> Result<ChatCompletion> {
        let reply = Self::reply_for(request);
        let prompt_tokens: TokenCount = request.messages.iter().map(message_tokens).sum();
        let completion_tokens = estimate_tokens(reply.chars().count()).max(1);
        let usage = TokenUsage::new(prompt_tokens, completion_tokens);

        ldebug!(
            request_id,
            LogStage::Upstream,
            LogComponent::Simulator,
            "simulated_completion",
            "Generated simulated completion",
            prompt_tokens = prompt_tokens,
            completion_tokens = completion_tokens,
        );

        let body = json!({
            "id": format!("chatcmpl-{request_id}"),
            "object": "chat.completion",
            "created": self.clock.now().timestamp(),
            "model": request.model,
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": reply},
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": usage.prompt_tokens,
                "completion_tokens": usage.completion_tokens,
                "total_tokens": usage.total()
            }
        });

        Ok(ChatCompletion {
            body,
            usage: Some(usage),
            simulated: true,
            latency_ms: 0,
        })
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0)]
    #[case(1, 1)]
    #[case(4, 1)]
    #[case(5, 2)]
    #[case(400, 100)]
    fn test_estimate_tokens(#[case] chars: usize, #[case] expected: TokenCount) {
        assert_eq!(estimate_tokens(chars), expected);
    }

    #[tokio::test]
    async fn test_simulated_usage() {
        let request = ChatRequest {
            model: "gpt-4".to_string(),
            messages: vec![
                ChatMessage::text("system", ""),
                ChatMessage::text("user", "hi"),
                ChatMessage::text("user", "12345678"),
            ],
            max_tokens: None,
            temperature: None,
            extra: serde_json::Map::new(),
        };

        let backend = SimulatedChatBackend::new(Arc::new(ManualClock::at_unix(1_700_000_000)));
        let completion = backend.complete(&request, "req-1").await.unwrap();
        let usage = completion.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 3);
        assert!(usage.completion_tokens >= 1);
        assert!(completion.simulated);
        assert_eq!(completion.body["usage"]["total_tokens"], usage.total());
        assert_eq!(completion.body["model"], "gpt-4");
        assert_eq!(completion.body["created"], 1_700_000_000);
        assert_eq!(completion.body["id"], "chatcmpl-req-1");
    }
}
