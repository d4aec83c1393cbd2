//! # HTTP 处理器
//!
//! 成功响应附带费用明细头，所有响应都带 `X-Cloud-Request-Id`

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;

use super::server::AppState;
use crate::error::{ErrorCategory, ProxyError};
use crate::logging::{LogComponent, LogStage};
use crate::pricing::FeeCalculation;
use crate::{ldebug, lwarn};

pub const BASE_COST_HEADER: &str = "x-sandbox-base-cost-usd";
pub const FEE_HEADER: &str = "x-sandbox-fee-usd";
pub const TOTAL_COST_HEADER: &str = "x-sandbox-total-usd";
pub const REQUEST_ID_HEADER: &str = "x-cloud-request-id";

#[derive(Debug, Default, Deserialize)]
pub struct ChatQuery {
    /// 调用方自定义的会话ID
    pub session: Option<String>,
}

/// `POST /agent/chat`
///
/// 查询参数或请求体提取失败同样走统一的 JSON 错误响应
pub async fn chat_handler(
    State(state): State<AppState>,
    query: Result<Query<ChatQuery>, QueryRejection>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();

    let result = match (query, body) {
        (Ok(Query(query)), Ok(body)) => {
            state
                .pipeline
                .handle(&request_id, &headers, query.session.as_deref(), &body)
                .await
        }
        (Err(rejection), _) => Err(ProxyError::malformed_body(format!(
            "invalid query string: {}",
            rejection.body_text()
        ))),
        (_, Err(rejection)) => Err(ProxyError::malformed_body(format!(
            "failed to read request body: {}",
            rejection.body_text()
        ))),
    };

    let mut response = match result {
        Ok(outcome) => {
            let mut response = (StatusCode::OK, Json(outcome.completion.body)).into_response();
            insert_fee_headers(response.headers_mut(), &outcome.fee);
            response
        }
        Err(e) => {
            let (status, _, code) = e.to_http_response_parts();
            if e.category() == ErrorCategory::Server {
                lwarn!(
                    &request_id,
                    LogStage::Response,
                    LogComponent::Handler,
                    "chat_failed",
                    "Chat request failed",
                    status = status.as_u16(),
                    code = code,
                    error = %e,
                );
            } else {
                ldebug!(
                    &request_id,
                    LogStage::Response,
                    LogComponent::Handler,
                    "chat_rejected",
                    "Chat request rejected",
                    status = status.as_u16(),
                    code = code,
                );
            }
            e.into_response()
        }
    };

    insert_header(response.headers_mut(), REQUEST_ID_HEADER, request_id);
    response
}

/// `/agent/chat` 上非 POST 方法
pub async fn method_not_allowed(method: Method) -> Response {
    let mut response = ProxyError::MethodNotAllowed {
        method: method.to_string(),
    }
    .into_response();
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static("POST"));
    response
}

/// `GET /health`
pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let stats = state.pricing_cache.stats();
    Json(json!({
        "status": "ok",
        "pricing_cache": {
            "hits": stats.hits,
            "refreshes": stats.refreshes,
            "failures": stats.failures,
        },
        "usage_recorder": {
            "recorded": state.recorder.recorded_count(),
            "failed": state.recorder.failed_count(),
            "in_flight": state.recorder.in_flight(),
        }
    }))
}

/// 费用头统一保留 4 位小数
pub fn insert_fee_headers(headers: &mut HeaderMap, fee: &FeeCalculation) {
    insert_header(headers, BASE_COST_HEADER, format!("{:.4}", fee.base_cost_usd));
    insert_header(headers, FEE_HEADER, format!("{:.4}", fee.platform_fee_usd));
    insert_header(headers, TOTAL_COST_HEADER, format!("{:.4}", fee.total_cost_usd));
}

fn insert_header(headers: &mut HeaderMap, name: &'static str, value: String) {
    if let Ok(value) = HeaderValue::try_from(value) {
        headers.insert(HeaderName::from_static(name), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_headers_format() {
        let mut headers = HeaderMap::new();
        insert_fee_headers(
            &mut headers,
            &FeeCalculation {
                base_cost_usd: 0.007,
                platform_fee_usd: 0.0014,
                total_cost_usd: 0.0084,
            },
        );
        assert_eq!(headers[BASE_COST_HEADER], "0.0070");
        assert_eq!(headers[FEE_HEADER], "0.0014");
        assert_eq!(headers[TOTAL_COST_HEADER], "0.0084");
    }

    #[test]
    fn test_zero_fee_headers() {
        let mut headers = HeaderMap::new();
        insert_fee_headers(&mut headers, &FeeCalculation::ZERO);
        assert_eq!(headers[TOTAL_COST_HEADER], "0.0000");
    }
}
