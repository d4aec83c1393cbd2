//! # Entity 模块
//!
//! 计费代理使用的 Sea-ORM 实体定义

pub mod cloud_api_keys;
pub mod pricing_overrides;
pub mod usage_events;

pub use cloud_api_keys::Entity as CloudApiKeys;
pub use pricing_overrides::Entity as PricingOverrides;
pub use usage_events::Entity as UsageEvents;

#[cfg(test)]
mod tests;
