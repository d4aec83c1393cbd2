//! # 数据库模块
//!
//! 数据库连接和迁移管理

use crate::config::DatabaseConfig;
use crate::error::{Context, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{lerror, linfo, lwarn};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;

/// 初始化数据库连接
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection> {
    config.ensure_database_path()?;

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Database,
        "db_connecting",
        "正在连接数据库",
        url = %config.url.split('?').next().unwrap_or(&config.url),
    );

    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout))
        .sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .context("连接数据库失败")?;

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Database,
        "db_connected",
        "数据库连接成功"
    );
    Ok(db)
}

/// 运行数据库迁移
pub async fn run_migrations(db: &DatabaseConnection) -> std::result::Result<(), DbErr> {
    let pending = ::migration::Migrator::get_pending_migrations(db).await?;
    if pending.is_empty() {
        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::Database,
            "migrations_up_to_date",
            "所有迁移都已应用"
        );
        return Ok(());
    }

    lwarn!(
        "system",
        LogStage::Startup,
        LogComponent::Database,
        "migrations_pending",
        "存在待应用的迁移",
        pending = pending.len(),
    );

    match ::migration::Migrator::up(db, None).await {
        Ok(()) => {
            linfo!(
                "system",
                LogStage::Startup,
                LogComponent::Database,
                "migrations_applied",
                "数据库迁移完成"
            );
            Ok(())
        }
        Err(e) => {
            lerror!(
                "system",
                LogStage::Startup,
                LogComponent::Database,
                "migrations_failed",
                &format!("数据库迁移失败: {e}")
            );
            Err(e)
        }
    }
}
