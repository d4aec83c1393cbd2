//! # 聊天请求与响应

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::usage::TokenUsage;

/// 单条消息；`content` 可以是字符串或多段内容数组
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatMessage {
    #[must_use]
    pub fn text(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: Value::String(content.into()),
            extra: Map::new(),
        }
    }

    /// 文本内容的字符数，多段内容累加其中的 `text` 字段
    #[must_use]
    pub fn content_chars(&self) -> usize {
        match &self.content {
            Value::String(text) => text.chars().count(),
            Value::Array(parts) => parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .map(|text| text.chars().count())
                .sum(),
            Value::Null => 0,
            other => other.to_string().chars().count(),
        }
    }
}

/// 聊天补全请求，未识别的参数原样透传给上游
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 上游（或模拟器）返回的补全结果
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletion {
    /// 原样返回给调用方的响应体
    pub body: Value,
    /// 上游未报告用量时为 `None`
    pub usage: Option<TokenUsage>,
    pub simulated: bool,
    pub latency_ms: u64,
}

/// 从 OpenAI 风格响应体中读取 `usage`
#[must_use]
pub fn extract_usage(body: &Value) -> Option<TokenUsage> {
    let usage = body.get("usage")?;
    let prompt = usage.get("prompt_tokens").and_then(Value::as_u64)?;
    let completion = usage
        .get("completion_tokens")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    Some(TokenUsage::new(prompt, completion))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extra_params_round_trip() {
        let raw = json!({
            "model": "gpt-4",
            "messages": [{"role": "user", "content": "hi", "name": "alice"}],
            "top_p": 0.9,
            "stream": false
        });
        let request: ChatRequest = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(request.extra.get("top_p"), Some(&json!(0.9)));
        assert_eq!(request.messages[0].extra.get("name"), Some(&json!("alice")));
        assert_eq!(serde_json::to_value(&request).unwrap(), raw);
    }

    #[test]
    fn test_content_chars() {
        assert_eq!(ChatMessage::text("user", "héllo").content_chars(), 5);
        let multipart = ChatMessage {
            role: "user".to_string(),
            content: json!([{"type": "text", "text": "abc"}, {"type": "image_url"}]),
            extra: Map::new(),
        };
        assert_eq!(multipart.content_chars(), 3);
    }

    #[test]
    fn test_extract_usage() {
        let body = json!({"usage": {"prompt_tokens": 100, "completion_tokens": 200, "total_tokens": 300}});
        assert_eq!(extract_usage(&body), Some(TokenUsage::new(100, 200)));
        assert_eq!(extract_usage(&json!({"choices": []})), None);
    }
}
