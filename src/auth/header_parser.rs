//! # 入站认证头解析器
//!
//! 从请求头中提取调用方出示的API密钥，支持两个位置：
//! - `Authorization: Bearer <key>`
//! - `X-Eliza-Cloud-Key: <key>`
//!
//! 两者同时存在时以 Bearer 为准。

use axum::http::HeaderMap;

/// 标准认证头
pub const BEARER_HEADER: &str = "authorization";
/// 专用密钥头
pub const CLOUD_KEY_HEADER: &str = "x-eliza-cloud-key";

const BEARER_PREFIX: &str = "bearer ";

/// 入站认证头解析器
pub struct AuthHeaderParser;

impl AuthHeaderParser {
    /// 提取出示的密钥；两个位置都没有有效值时返回 `None`
    #[must_use]
    pub fn extract_presented_key(headers: &HeaderMap) -> Option<String> {
        Self::from_bearer(headers).or_else(|| Self::from_cloud_key_header(headers))
    }

    /// `Authorization` 头必须使用 Bearer 方案，其他方案视为未提供
    fn from_bearer(headers: &HeaderMap) -> Option<String> {
        let value = headers.get(BEARER_HEADER)?.to_str().ok()?.trim();
        if value.len() < BEARER_PREFIX.len()
            || !value.is_char_boundary(BEARER_PREFIX.len())
            || !value[..BEARER_PREFIX.len()].eq_ignore_ascii_case(BEARER_PREFIX)
        {
            return None;
        }
        non_empty(&value[BEARER_PREFIX.len()..])
    }

    fn from_cloud_key_header(headers: &HeaderMap) -> Option<String> {
        let value = headers.get(CLOUD_KEY_HEADER)?.to_str().ok()?;
        non_empty(value)
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use rstest::rstest;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[rstest]
    #[case::bearer(&[("authorization", "Bearer sk-one")], Some("sk-one"))]
    #[case::lowercase_scheme(&[("authorization", "bearer sk-one")], Some("sk-one"))]
    #[case::cloud_header(&[("x-eliza-cloud-key", "sk-two")], Some("sk-two"))]
    #[case::bearer_wins(
        &[("authorization", "Bearer sk-one"), ("x-eliza-cloud-key", "sk-two")],
        Some("sk-one")
    )]
    #[case::basic_scheme_falls_through(
        &[("authorization", "Basic abc"), ("x-eliza-cloud-key", "sk-two")],
        Some("sk-two")
    )]
    #[case::empty_bearer(&[("authorization", "Bearer   ")], None)]
    #[case::empty_cloud_header(&[("x-eliza-cloud-key", "")], None)]
    #[case::nothing(&[], None)]
    fn test_extract_presented_key(
        #[case] pairs: &[(&'static str, &'static str)],
        #[case] expected: Option<&str>,
    ) {
        let extracted = AuthHeaderParser::extract_presented_key(&headers(pairs));
        assert_eq!(extracted.as_deref(), expected);
    }
}
