//! # 用量账本
//!
//! 每个成功计价的请求写入一条 `usage_events` 记录。写入在后台任务中完成，
//! 失败只记录日志，不影响已经返回给调用方的响应。

pub mod event;
pub mod recorder;
pub mod store;

pub use event::{TokenUsage, UsageEvent, UsageMetadata};
pub use recorder::UsageRecorder;
pub use store::{DbUsageStore, UsageStore};
