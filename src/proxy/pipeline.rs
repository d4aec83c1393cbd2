//! # 请求处理流水线
//!
//! ```text
//! Received → Authenticated → Validated → Responded → Priced → (record, 后台) → Done
//! ```
//!
//! 认证、校验、上游三个阶段失败时直接返回错误，不会计价也不会记录用量。
//! 用量记录在返回响应之前派发，但响应不等待其完成。

use axum::http::HeaderMap;
use std::sync::Arc;

use super::backend::ChatBackend;
use super::types::ChatCompletion;
use super::validation::validate_chat_body;
use crate::auth::ApiKeyValidator;
use crate::error::Result;
use crate::logging::{LogComponent, LogStage};
use crate::pricing::{FeeCalculation, FeeCalculator};
use crate::usage::{UsageMetadata, UsageRecorder};
use crate::{ldebug, linfo};

/// 成功处理的请求
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub request_id: String,
    pub key_id: String,
    pub completion: ChatCompletion,
    pub fee: FeeCalculation,
}

pub struct ChatPipeline {
    validator: ApiKeyValidator,
    backend: Arc<dyn ChatBackend>,
    calculator: Arc<FeeCalculator>,
    recorder: Arc<UsageRecorder>,
    default_session: String,
}

impl ChatPipeline {
    #[must_use]
    pub fn new(
        validator: ApiKeyValidator,
        backend: Arc<dyn ChatBackend>,
        calculator: Arc<FeeCalculator>,
        recorder: Arc<UsageRecorder>,
        default_session: impl Into<String>,
    ) -> Self {
        Self {
            validator,
            backend,
            calculator,
            recorder,
            default_session: default_session.into(),
        }
    }

    #[must_use]
    pub fn recorder(&self) -> &Arc<UsageRecorder> {
        &self.recorder
    }

    /// 处理一次聊天请求
    pub async fn handle(
        &self,
        request_id: &str,
        headers: &HeaderMap,
        session: Option<&str>,
        body: &[u8],
    ) -> Result<PipelineOutcome> {
        let caller = self.validator.authenticate(headers, request_id).await?;

        let request = validate_chat_body(body).inspect_err(|e| {
            ldebug!(
                request_id,
                LogStage::Validation,
                LogComponent::Pipeline,
                "body_rejected",
                "Request body rejected",
                error = %e,
            );
        })?;

        let completion = self.backend.complete(&request, request_id).await?;

        let usage = completion.usage;
        let tokens = usage.unwrap_or_default();
        let priced = self
            .calculator
            .price_usage(
                &request.model,
                tokens.prompt_tokens,
                tokens.completion_tokens,
                request_id,
            )
            .await;

        let session = session
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.default_session);
        let metadata = UsageMetadata {
            message_count: request.messages.len(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            simulated: completion.simulated,
            upstream_latency_ms: completion.latency_ms,
            fee_rate: self.calculator.fee_rate().as_f64(),
            pricing_found: priced.pricing_found(),
        };

        // 派发后不等待
        drop(self.recorder.record(
            &caller.key_id,
            Some(session),
            Some(&request.model),
            usage,
            Some(priced.fee),
            request_id,
            &metadata.to_json(),
        ));

        linfo!(
            request_id,
            LogStage::Response,
            LogComponent::Pipeline,
            "chat_completed",
            "Chat request completed",
            key_id = %caller.key_id,
            model = %request.model,
            session = %session,
            backend = self.backend.name(),
            total_cost_usd = priced.fee.total_cost_usd,
        );

        Ok(PipelineOutcome {
            request_id: request_id.to_string(),
            key_id: caller.key_id,
            completion,
            fee: priced.fee,
        })
    }
}
