//! # 请求体校验
//!
//! `model` 必须是非空字符串，`messages` 必须是非空数组，
//! 且每条消息都带有 `role` 和 `content`。

use serde_json::Value;

use super::types::ChatRequest;
use crate::error::{ProxyError, Result};

/// 校验并解析聊天请求体
pub fn validate_chat_body(body: &[u8]) -> Result<ChatRequest> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ProxyError::malformed_body(format!("request body is not valid JSON: {e}")))?;

    let Some(object) = value.as_object() else {
        return Err(ProxyError::malformed_body("request body must be a JSON object"));
    };

    match object.get("model").and_then(Value::as_str) {
        Some(model) if !model.trim().is_empty() => {}
        _ => return Err(ProxyError::malformed_body("`model` must be a non-empty string")),
    }

    let messages = match object.get("messages").and_then(Value::as_array) {
        Some(messages) if !messages.is_empty() => messages,
        _ => return Err(ProxyError::malformed_body("`messages` must be a non-empty array")),
    };

    for (index, message) in messages.iter().enumerate() {
        let Some(message) = message.as_object() else {
            return Err(ProxyError::invalid_message(index, "message must be an object"));
        };
        if !message.get("role").is_some_and(Value::is_string) {
            return Err(ProxyError::invalid_message(index, "missing `role`"));
        }
        if message.get("content").is_none_or(Value::is_null) {
            return Err(ProxyError::invalid_message(index, "missing `content`"));
        }
    }

    serde_json::from_value(value).map_err(|e| ProxyError::malformed_body(e.to_string()))
}
