//! # 用量事件存储

use async_trait::async_trait;
use entity::usage_events::Entity as UsageEvents;
use sea_orm::{DatabaseConnection, EntityTrait};
use std::sync::Arc;

use super::UsageEvent;
use crate::error::Result;

/// 只追加的用量事件存储
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsageStore: Send + Sync {
    async fn insert(&self, event: UsageEvent) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct DbUsageStore {
    db: Arc<DatabaseConnection>,
}

impl DbUsageStore {
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UsageStore for DbUsageStore {
    async fn insert(&self, event: UsageEvent) -> Result<()> {
        UsageEvents::insert(event.to_active_model())
            .exec_without_returning(&*self.db)
            .await?;
        Ok(())
    }
}
