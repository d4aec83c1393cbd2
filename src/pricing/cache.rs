//! # 批量定价表缓存
//!
//! 整表缓存，过期后在下一次读取时重新拉取。单次拉取受 `fetch_timeout` 限制，
//! 超时与失败一样返回空表。失败后的空表只保留 `failure_ttl`，为零时下一次读取立即重试。
//! 并发刷新不做合并，后写入者覆盖。

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

use super::{PricingSource, PricingTable};
use crate::clock::Clock;
use crate::error::ProxyError;
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, linfo, lwarn};

struct CachedTable {
    table: Arc<PricingTable>,
    expires_at: DateTime<Utc>,
}

/// 默认单次拉取超时
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(2);

/// 缓存命中统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PricingCacheStats {
    /// 未过期命中次数
    pub hits: u64,
    /// 成功刷新次数
    pub refreshes: u64,
    /// 拉取失败或超时次数
    pub failures: u64,
}

/// 带 TTL 的批量定价表缓存
pub struct PricingCache {
    source: Arc<dyn PricingSource>,
    ttl: chrono::Duration,
    fetch_timeout: Duration,
    failure_ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
    state: RwLock<Option<CachedTable>>,
    hits: AtomicU64,
    refreshes: AtomicU64,
    failures: AtomicU64,
}

impl PricingCache {
    #[must_use]
    pub fn new(source: Arc<dyn PricingSource>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        Self {
            source,
            ttl,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            failure_ttl: chrono::Duration::zero(),
            clock,
            state: RwLock::new(None),
            hits: AtomicU64::new(0),
            refreshes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// 设置单次拉取超时
    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// 拉取失败后空表的保留时间
    #[must_use]
    pub fn with_failure_ttl(mut self, ttl: Duration) -> Self {
        self.failure_ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        self
    }

    /// 获取当前定价表，过期或首次访问时重新拉取
    pub async fn table(&self, request_id: &str) -> Arc<PricingTable> {
        let now = self.clock.now();

        {
            let state = self.state.read().await;
            if let Some(cached) = state.as_ref().filter(|c| now < c.expires_at) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Arc::clone(&cached.table);
            }
        }

        self.refresh(request_id, now).await
    }

    async fn refresh(&self, request_id: &str, now: DateTime<Utc>) -> Arc<PricingTable> {
        ldebug!(
            request_id,
            LogStage::Cache,
            LogComponent::PricingSource,
            "pricing_refresh_start",
            "Refreshing bulk pricing table",
            source = self.source.name(),
        );

        let fetched = match tokio::time::timeout(self.fetch_timeout, self.source.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(ProxyError::pricing_unavailable(format!(
                "pricing fetch timed out after {}ms",
                self.fetch_timeout.as_millis()
            ))),
        };

        match fetched {
            Ok(table) => {
                self.refreshes.fetch_add(1, Ordering::Relaxed);
                let table = Arc::new(table);
                let expires_at = now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
                *self.state.write().await = Some(CachedTable {
                    table: Arc::clone(&table),
                    expires_at,
                });
                linfo!(
                    request_id,
                    LogStage::Cache,
                    LogComponent::PricingSource,
                    "pricing_refreshed",
                    "Bulk pricing table refreshed",
                    source = self.source.name(),
                    models = table.len(),
                    expires_at = %expires_at,
                );
                table
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                lwarn!(
                    request_id,
                    LogStage::Cache,
                    LogComponent::PricingSource,
                    "pricing_refresh_failed",
                    "Bulk pricing refresh failed, using empty table",
                    source = self.source.name(),
                    error = %e,
                    retry_after_seconds = self.failure_ttl.num_seconds(),
                );
                let table = Arc::new(PricingTable::new());
                if self.failure_ttl > chrono::Duration::zero() {
                    let expires_at = now
                        .checked_add_signed(self.failure_ttl)
                        .unwrap_or(DateTime::<Utc>::MAX_UTC);
                    *self.state.write().await = Some(CachedTable {
                        table: Arc::clone(&table),
                        expires_at,
                    });
                }
                table
            }
        }
    }

    #[must_use]
    pub fn stats(&self) -> PricingCacheStats {
        PricingCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}
