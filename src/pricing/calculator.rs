//! # 费用计算
//!
//! ```text
//! base  = prompt/1000 * input_per_1k + completion/1000 * output_per_1k
//! fee   = base * fee_rate
//! total = base + fee
//! ```
//!
//! 三个字段分别从未舍入的中间值四舍五入到 4 位小数，
//! 因此 `total` 与 `base + fee` 可能相差 0.0001。

use serde::Serialize;
use std::sync::Arc;

use super::{ModelPricing, PricingOrigin, PricingResolver};
use crate::logging::{LogComponent, LogStage};
use crate::types::{CostValue, FeeRate, TokenCount};
use crate::{ldebug, lwarn};

/// 四舍五入到 4 位小数（远离零方向）
#[must_use]
pub fn round_usd(value: CostValue) -> CostValue {
    (value * 10_000.0).round() / 10_000.0
}

/// 费用明细
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeeCalculation {
    pub base_cost_usd: CostValue,
    pub platform_fee_usd: CostValue,
    pub total_cost_usd: CostValue,
}

impl FeeCalculation {
    pub const ZERO: Self = Self {
        base_cost_usd: 0.0,
        platform_fee_usd: 0.0,
        total_cost_usd: 0.0,
    };

    /// 按单价计算；结果出现非有限值时返回零费用
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_pricing(
        pricing: &ModelPricing,
        prompt_tokens: TokenCount,
        completion_tokens: TokenCount,
        fee_rate: FeeRate,
    ) -> Self {
        let prompt_cost = (prompt_tokens as f64 / 1000.0) * pricing.input_per_1k_usd;
        let completion_cost = (completion_tokens as f64 / 1000.0) * pricing.output_per_1k_usd;
        let base = prompt_cost + completion_cost;
        let fee = base * fee_rate.as_f64();
        let total = base + fee;

        let calculation = Self {
            base_cost_usd: round_usd(base),
            platform_fee_usd: round_usd(fee),
            total_cost_usd: round_usd(total),
        };

        if calculation.is_finite() {
            calculation
        } else {
            Self::ZERO
        }
    }

    fn is_finite(&self) -> bool {
        self.base_cost_usd.is_finite()
            && self.platform_fee_usd.is_finite()
            && self.total_cost_usd.is_finite()
    }
}

impl Default for FeeCalculation {
    fn default() -> Self {
        Self::ZERO
    }
}

/// 带定价来源的计算结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricedUsage {
    pub fee: FeeCalculation,
    /// 未找到定价时为 `None`
    pub origin: Option<PricingOrigin>,
}

impl PricedUsage {
    #[must_use]
    pub const fn pricing_found(&self) -> bool {
        self.origin.is_some()
    }
}

/// 费用计算器
pub struct FeeCalculator {
    resolver: Arc<PricingResolver>,
    fee_rate: FeeRate,
}

impl FeeCalculator {
    #[must_use]
    pub fn new(resolver: Arc<PricingResolver>, fee_rate: FeeRate) -> Self {
        Self { resolver, fee_rate }
    }

    #[must_use]
    pub const fn fee_rate(&self) -> FeeRate {
        self.fee_rate
    }

    /// 计算费用明细，不会返回错误
    pub async fn compute_fee(
        &self,
        model: &str,
        prompt_tokens: TokenCount,
        completion_tokens: TokenCount,
        request_id: &str,
    ) -> FeeCalculation {
        self.price_usage(model, prompt_tokens, completion_tokens, request_id)
            .await
            .fee
    }

    pub async fn price_usage(
        &self,
        model: &str,
        prompt_tokens: TokenCount,
        completion_tokens: TokenCount,
        request_id: &str,
    ) -> PricedUsage {
        let Some(resolved) = self.resolver.resolve(model, request_id).await else {
            lwarn!(
                request_id,
                LogStage::Pricing,
                LogComponent::FeeCalculator,
                "pricing_missing",
                "No pricing known for model, fee is zero",
                model = model,
            );
            return PricedUsage {
                fee: FeeCalculation::ZERO,
                origin: None,
            };
        };

        let fee = FeeCalculation::from_pricing(
            &resolved.pricing,
            prompt_tokens,
            completion_tokens,
            self.fee_rate,
        );

        ldebug!(
            request_id,
            LogStage::Pricing,
            LogComponent::FeeCalculator,
            "fee_computed",
            "Fee computed",
            model = model,
            origin = %resolved.origin,
            prompt_tokens = prompt_tokens,
            completion_tokens = completion_tokens,
            base_cost_usd = fee.base_cost_usd,
            platform_fee_usd = fee.platform_fee_usd,
            total_cost_usd = fee.total_cost_usd,
        );

        PricedUsage {
            fee,
            origin: Some(resolved.origin),
        }
    }
}
