//! # 认证模块
//!
//! 调用方API密钥的提取与白名单校验

pub mod api_key;
pub mod header_parser;

pub use api_key::{
    ApiKeyRecord, ApiKeyValidator, AuthenticatedKey, CredentialStore, DbCredentialStore,
    ValidationOutcome,
};
pub use header_parser::{AuthHeaderParser, BEARER_HEADER, CLOUD_KEY_HEADER};
