//! # 单价解析
//!
//! 覆盖表命中则直接使用，否则查批量定价表；两者都没有时返回 `None`。

use std::fmt;
use std::sync::Arc;

use super::{ModelPricing, PricingCache, PricingOverrideStore};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, lwarn};

/// 单价来自哪一层
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingOrigin {
    Override,
    Bulk,
}

impl fmt::Display for PricingOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Override => f.write_str("override"),
            Self::Bulk => f.write_str("bulk"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPricing {
    pub pricing: ModelPricing,
    pub origin: PricingOrigin,
}

pub struct PricingResolver {
    overrides: Arc<dyn PricingOverrideStore>,
    cache: Arc<PricingCache>,
}

impl PricingResolver {
    #[must_use]
    pub fn new(overrides: Arc<dyn PricingOverrideStore>, cache: Arc<PricingCache>) -> Self {
        Self { overrides, cache }
    }

    /// 解析模型单价
    ///
    /// 覆盖表查询失败时记录日志并继续查批量表
    pub async fn resolve(&self, model: &str, request_id: &str) -> Option<ResolvedPricing> {
        match self.overrides.find_override(model).await {
            Ok(Some(pricing)) => {
                ldebug!(
                    request_id,
                    LogStage::Pricing,
                    LogComponent::PricingResolver,
                    "override_hit",
                    "Using pricing override",
                    model = model,
                );
                return Some(ResolvedPricing {
                    pricing,
                    origin: PricingOrigin::Override,
                });
            }
            Ok(None) => {}
            Err(e) => {
                lwarn!(
                    request_id,
                    LogStage::Pricing,
                    LogComponent::PricingResolver,
                    "override_lookup_failed",
                    "Pricing override lookup failed, falling back to bulk table",
                    model = model,
                    error = %e,
                );
            }
        }

        let table = self.cache.table(request_id).await;
        let resolved = table.get(model).map(|pricing| ResolvedPricing {
            pricing: *pricing,
            origin: PricingOrigin::Bulk,
        });

        if resolved.is_none() {
            ldebug!(
                request_id,
                LogStage::Pricing,
                LogComponent::PricingResolver,
                "pricing_not_found",
                "No pricing for model",
                model = model,
            );
        }
        resolved
    }

    /// 只返回单价
    pub async fn resolve_price(&self, model: &str, request_id: &str) -> Option<ModelPricing> {
        self.resolve(model, request_id).await.map(|r| r.pricing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::error::ProxyError;
    use crate::pricing::overrides::MockPricingOverrideStore;
    use crate::pricing::{PricingTable, StaticPricingSource};
    use std::time::Duration;

    fn cache_with(table: PricingTable) -> Arc<PricingCache> {
        Arc::new(PricingCache::new(
            Arc::new(StaticPricingSource::new(table)),
            Duration::from_secs(300),
            Arc::new(SystemClock),
        ))
    }

    fn bulk() -> PricingTable {
        PricingTable::from([(
            "gpt-4o-mini".to_string(),
            ModelPricing::new(0.00015, 0.0006),
        )])
    }

    #[tokio::test]
    async fn test_override_takes_precedence() {
        let mut overrides = MockPricingOverrideStore::new();
        overrides
            .expect_find_override()
            .returning(|_| Ok(Some(ModelPricing::new(0.01, 0.03))));
        let resolver = PricingResolver::new(Arc::new(overrides), cache_with(bulk()));

        let resolved = resolver.resolve("gpt-4o-mini", "req-1").await.unwrap();
        assert_eq!(resolved.origin, PricingOrigin::Override);
        assert_eq!(resolved.pricing, ModelPricing::new(0.01, 0.03));
    }

    #[tokio::test]
    async fn test_falls_back_to_bulk() {
        let mut overrides = MockPricingOverrideStore::new();
        overrides.expect_find_override().returning(|_| Ok(None));
        let resolver = PricingResolver::new(Arc::new(overrides), cache_with(bulk()));

        let resolved = resolver.resolve("gpt-4o-mini", "req-2").await.unwrap();
        assert_eq!(resolved.origin, PricingOrigin::Bulk);
        assert!(resolver.resolve("unknown-model", "req-2").await.is_none());
    }

    #[tokio::test]
    async fn test_override_error_falls_through() {
        let mut overrides = MockPricingOverrideStore::new();
        overrides
            .expect_find_override()
            .returning(|_| Err(ProxyError::internal("db locked")));
        let resolver = PricingResolver::new(Arc::new(overrides), cache_with(bulk()));

        let price = resolver.resolve_price("gpt-4o-mini", "req-3").await;
        assert_eq!(price, Some(ModelPricing::new(0.00015, 0.0006)));
    }
}
