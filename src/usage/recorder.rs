//! # 用量记录器
//!
//! 事件在派发后台任务之前构建完成，写入本身在 `TaskTracker` 跟踪的任务里执行，
//! 优雅停机时等待所有写入结束。没有重试队列，至多写入一次。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

use super::{TokenUsage, UsageEvent, UsageStore};
use crate::clock::Clock;
use crate::error::ProxyError;
use crate::logging::{LogComponent, LogStage};
use crate::pricing::FeeCalculation;
use crate::{ldebug, lerror, linfo};

/// 用量记录器
pub struct UsageRecorder {
    store: Arc<dyn UsageStore>,
    clock: Arc<dyn Clock>,
    tracker: TaskTracker,
    recorded: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl UsageRecorder {
    #[must_use]
    pub fn new(store: Arc<dyn UsageStore>, clock: Arc<dyn Clock>, tracker: TaskTracker) -> Self {
        Self {
            store,
            clock,
            tracker,
            recorded: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 构建用量事件，时间戳取自注入的时钟
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn build_event(
        &self,
        key_id: &str,
        session_id: Option<&str>,
        model: Option<&str>,
        usage: Option<TokenUsage>,
        fee: Option<FeeCalculation>,
        request_id: &str,
        metadata: &serde_json::Value,
    ) -> UsageEvent {
        UsageEvent {
            id: request_id.to_string(),
            ts: self.clock.now().timestamp(),
            cloud_key_id: key_id.to_string(),
            session_id: session_id.map(str::to_string),
            model: model.map(str::to_string),
            usage,
            fee,
            request_id: request_id.to_string(),
            meta: metadata.to_string(),
        }
    }

    /// 派发一次写入，立即返回
    ///
    /// 返回的句柄只用于测试等待；写入失败不会通过句柄传播
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &self,
        key_id: &str,
        session_id: Option<&str>,
        model: Option<&str>,
        usage: Option<TokenUsage>,
        fee: Option<FeeCalculation>,
        request_id: &str,
        metadata: &serde_json::Value,
    ) -> JoinHandle<()> {
        let event = self.build_event(key_id, session_id, model, usage, fee, request_id, metadata);
        self.record_event(event)
    }

    pub fn record_event(&self, event: UsageEvent) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let recorded = Arc::clone(&self.recorded);
        let failed = Arc::clone(&self.failed);

        ldebug!(
            &event.request_id,
            LogStage::Recording,
            LogComponent::UsageRecorder,
            "usage_record_scheduled",
            "Usage event scheduled",
            cloud_key_id = %event.cloud_key_id,
        );

        self.tracker.spawn(async move {
            let request_id = event.request_id.clone();
            match store.insert(event).await {
                Ok(()) => {
                    recorded.fetch_add(1, Ordering::Relaxed);
                    ldebug!(
                        &request_id,
                        LogStage::Recording,
                        LogComponent::UsageRecorder,
                        "usage_recorded",
                        "Usage event stored"
                    );
                }
                Err(e) => {
                    failed.fetch_add(1, Ordering::Relaxed);
                    let failure = ProxyError::recording_failure_with_source("usage insert failed", e);
                    lerror!(
                        &request_id,
                        LogStage::Recording,
                        LogComponent::UsageRecorder,
                        "usage_record_failed",
                        "Usage event dropped",
                        error = %failure,
                    );
                }
            }
        })
    }

    /// 已成功写入的事件数
    #[must_use]
    pub fn recorded_count(&self) -> u64 {
        self.recorded.load(Ordering::Relaxed)
    }

    /// 写入失败的事件数
    #[must_use]
    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// 当前未完成的写入数
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// 停止接收并等待所有写入完成
    pub async fn shutdown(&self) {
        self.tracker.close();
        linfo!(
            "system",
            LogStage::Shutdown,
            LogComponent::UsageRecorder,
            "usage_drain",
            "Waiting for in-flight usage writes",
            in_flight = self.tracker.len(),
        );
        self.tracker.wait().await;
    }
}
