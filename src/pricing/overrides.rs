//! # 定价覆盖表
//!
//! `pricing_overrides` 表中的单价优先于批量定价表

use async_trait::async_trait;
use entity::pricing_overrides::Entity as PricingOverrides;
use sea_orm::{DatabaseConnection, EntityTrait};
use std::sync::Arc;

use super::ModelPricing;
use crate::error::Result;

/// 按模型查询覆盖单价
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PricingOverrideStore: Send + Sync {
    async fn find_override(&self, model: &str) -> Result<Option<ModelPricing>>;
}

#[derive(Debug, Clone)]
pub struct DbPricingOverrideStore {
    db: Arc<DatabaseConnection>,
}

impl DbPricingOverrideStore {
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PricingOverrideStore for DbPricingOverrideStore {
    async fn find_override(&self, model: &str) -> Result<Option<ModelPricing>> {
        let row = PricingOverrides::find_by_id(model.to_string())
            .one(&*self.db)
            .await?;
        Ok(row.map(ModelPricing::from))
    }
}
