//! # 错误处理测试

use crate::error::{Context, ErrorCategory, ProxyError};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use std::error::Error;

#[test]
fn test_auth_errors_map_to_401() {
    let (status, error_type, code) = ProxyError::MissingCredential.to_http_response_parts();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_type, "authentication_error");
    assert_eq!(code, "missing_credential");

    let (status, _, code) = ProxyError::InvalidCredential.to_http_response_parts();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(code, "invalid_credential");
}

#[test]
fn test_upstream_errors_distinguish_gateway_and_unavailable() {
    let (status, _, _) = ProxyError::upstream_error("500 from upstream", Some(500))
        .to_http_response_parts();
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (status, _, _) =
        ProxyError::upstream_unreachable("connection refused").to_http_response_parts();
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[test]
fn test_config_error_with_source() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "文件不存在");
    let err = ProxyError::config_with_source("配置文件加载失败", io_err);

    assert!(matches!(err, ProxyError::Config { .. }));
    assert!(err.to_string().contains("配置错误: 配置文件加载失败"));
    assert!(err.source().is_some());
}

#[test]
fn test_context_keeps_inner_status() {
    let result: Result<(), ProxyError> = Err(ProxyError::InvalidCredential);
    let err = result.context("校验调用方密钥").unwrap_err();

    assert!(err.to_string().starts_with("校验调用方密钥"));
    assert_eq!(err.to_http_response_parts().0, StatusCode::UNAUTHORIZED);
    assert_eq!(err.category(), ErrorCategory::Client);
}

#[test]
fn test_auto_conversion_from_db_error() {
    let db_err = sea_orm::DbErr::Custom("boom".to_string());
    let err: ProxyError = db_err.into();

    assert!(matches!(err, ProxyError::Database { .. }));
    assert_eq!(err.category(), ErrorCategory::Server);
}

#[tokio::test]
async fn test_error_response_body_shape() {
    let response = ProxyError::malformed_body("model is required").into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body["error"]["type"], "invalid_request_error");
    assert_eq!(body["error"]["code"], "malformed_request_body");
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("model is required")
    );
}
