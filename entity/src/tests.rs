//! # 实体定义测试
//!
//! 按实体定义在内存 SQLite 中建表，验证写入与读取

use crate::{cloud_api_keys, pricing_overrides, usage_events};
use sea_orm::{
    ColumnTrait, ConnectionTrait, Database, DatabaseConnection, EntityTrait, QueryFilter, Schema,
    Set,
};

async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    db.execute(backend.build(&schema.create_table_from_entity(cloud_api_keys::Entity)))
        .await
        .unwrap();
    db.execute(backend.build(&schema.create_table_from_entity(pricing_overrides::Entity)))
        .await
        .unwrap();
    db.execute(backend.build(&schema.create_table_from_entity(usage_events::Entity)))
        .await
        .unwrap();
    db
}

#[tokio::test]
async fn test_cloud_api_key_lookup_by_key() {
    let db = setup_db().await;
    cloud_api_keys::Entity::insert(cloud_api_keys::ActiveModel {
        id: Set("key_1".to_string()),
        key: Set("sk-cloud-123".to_string()),
        label: Set(Some("CI".to_string())),
        created_at: Set(1_700_000_000),
    })
    .exec_without_returning(&db)
    .await
    .unwrap();

    let found = cloud_api_keys::Entity::find()
        .filter(cloud_api_keys::Column::Key.eq("sk-cloud-123"))
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, "key_1");
    assert_eq!(found.label.as_deref(), Some("CI"));

    let missing = cloud_api_keys::Entity::find()
        .filter(cloud_api_keys::Column::Key.eq("sk-cloud-12"))
        .one(&db)
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_duplicate_key_rejected() {
    let db = setup_db().await;
    let row = |id: &str| cloud_api_keys::ActiveModel {
        id: Set(id.to_string()),
        key: Set("sk-cloud-same".to_string()),
        label: Set(None),
        created_at: Set(0),
    };

    cloud_api_keys::Entity::insert(row("key_a"))
        .exec_without_returning(&db)
        .await
        .unwrap();
    let second = cloud_api_keys::Entity::insert(row("key_b"))
        .exec_without_returning(&db)
        .await;
    assert!(second.is_err());
}

#[tokio::test]
async fn test_pricing_override_find_by_model() {
    let db = setup_db().await;
    pricing_overrides::Entity::insert(pricing_overrides::ActiveModel {
        model: Set("gpt-4o-mini".to_string()),
        input_per_1k_usd: Set(0.01),
        output_per_1k_usd: Set(0.03),
    })
    .exec_without_returning(&db)
    .await
    .unwrap();

    let found = pricing_overrides::Entity::find_by_id("gpt-4o-mini".to_string())
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert!((found.output_per_1k_usd - 0.03).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_usage_event_nullable_columns() {
    let db = setup_db().await;
    usage_events::Entity::insert(usage_events::ActiveModel {
        id: Set("req-1".to_string()),
        ts: Set(1_700_000_000),
        cloud_key_id: Set("key_1".to_string()),
        session_id: Set(None),
        model: Set(Some("gpt-4".to_string())),
        prompt_tokens: Set(None),
        completion_tokens: Set(None),
        base_cost_usd: Set(Some(0.0)),
        platform_fee_usd: Set(Some(0.0)),
        total_cost_usd: Set(Some(0.0)),
        request_id: Set("req-1".to_string()),
        meta: Set("{}".to_string()),
    })
    .exec_without_returning(&db)
    .await
    .unwrap();

    let event = usage_events::Entity::find_by_id("req-1".to_string())
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.id, event.request_id);
    assert_eq!(event.session_id, None);
    assert_eq!(event.prompt_tokens, None);
    assert_eq!(event.meta, "{}");
}
