//! # 用量事件实体定义
//!
//! 只追加的用量账本，每个处理完成的请求写入一行，插入后不再修改

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 用量事件
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "usage_events")]
pub struct Model {
    /// 请求关联ID，与 `request_id` 相同
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// 写入时间（Unix 秒）
    pub ts: i64,
    pub cloud_key_id: String,
    pub session_id: Option<String>,
    pub model: Option<String>,
    pub prompt_tokens: Option<i64>,
    pub completion_tokens: Option<i64>,
    pub base_cost_usd: Option<f64>,
    pub platform_fee_usd: Option<f64>,
    pub total_cost_usd: Option<f64>,
    pub request_id: String,
    /// 序列化后的JSON元数据
    #[sea_orm(column_type = "Text")]
    pub meta: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
