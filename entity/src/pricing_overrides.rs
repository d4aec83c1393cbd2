//! # 模型定价覆盖实体定义
//!
//! 按模型名唯一的单价覆盖，优先级高于批量定价表

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 定价覆盖实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pricing_overrides")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub model: String,
    /// 每千输入token价格（美元）
    pub input_per_1k_usd: f64,
    /// 每千输出token价格（美元）
    pub output_per_1k_usd: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
