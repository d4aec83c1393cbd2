//! # 定价与费用计算
//!
//! - `source`: 批量定价表来源（Redis `PRICING_V1`、JSON 文件）
//! - `cache`: 带 TTL 的批量定价表缓存
//! - `overrides`: 按模型的定价覆盖表
//! - `resolver`: 覆盖表优先、批量表兜底的单价解析
//! - `calculator`: token 用量到费用明细的计算

pub mod cache;
pub mod calculator;
pub mod overrides;
pub mod resolver;
pub mod source;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::CostValue;

pub use cache::{DEFAULT_FETCH_TIMEOUT, PricingCache, PricingCacheStats};
pub use calculator::{FeeCalculation, FeeCalculator, PricedUsage, round_usd};
pub use overrides::{DbPricingOverrideStore, PricingOverrideStore};
pub use resolver::{PricingOrigin, PricingResolver, ResolvedPricing};
pub use source::{
    EmptyPricingSource, FilePricingSource, PricingSource, RedisPricingSource,
    StaticPricingSource, parse_pricing_blob,
};

/// 单个模型的单价（每千 token，美元）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    /// 输入 token 单价
    pub input_per_1k_usd: CostValue,
    /// 输出 token 单价
    pub output_per_1k_usd: CostValue,
}

impl ModelPricing {
    #[must_use]
    pub const fn new(input_per_1k_usd: CostValue, output_per_1k_usd: CostValue) -> Self {
        Self {
            input_per_1k_usd,
            output_per_1k_usd,
        }
    }

    /// 单价必须是有限的非负数
    #[must_use]
    pub fn is_valid(&self) -> bool {
        [self.input_per_1k_usd, self.output_per_1k_usd]
            .iter()
            .all(|rate| rate.is_finite() && *rate >= 0.0)
    }
}

impl From<entity::pricing_overrides::Model> for ModelPricing {
    fn from(row: entity::pricing_overrides::Model) -> Self {
        Self::new(row.input_per_1k_usd, row.output_per_1k_usd)
    }
}

/// 模型名 → 单价
pub type PricingTable = HashMap<String, ModelPricing>;
