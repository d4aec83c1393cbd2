//! # 云端API密钥实体定义
//!
//! 调用方API密钥白名单，由外部开通流程写入，本服务只读

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// API密钥记录
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cloud_api_keys")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// 明文密钥（精确匹配）
    #[sea_orm(unique)]
    pub key: String,
    /// 显示名称
    pub label: Option<String>,
    /// 创建时间（Unix 秒）
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
