use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UsageEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UsageEvents::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UsageEvents::Ts).big_integer().not_null())
                    .col(
                        ColumnDef::new(UsageEvents::CloudKeyId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(UsageEvents::SessionId).string_len(255))
                    .col(ColumnDef::new(UsageEvents::Model).string_len(100))
                    .col(ColumnDef::new(UsageEvents::PromptTokens).big_integer())
                    .col(ColumnDef::new(UsageEvents::CompletionTokens).big_integer())
                    .col(ColumnDef::new(UsageEvents::BaseCostUsd).double())
                    .col(ColumnDef::new(UsageEvents::PlatformFeeUsd).double())
                    .col(ColumnDef::new(UsageEvents::TotalCostUsd).double())
                    .col(
                        ColumnDef::new(UsageEvents::RequestId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UsageEvents::Meta)
                            .text()
                            .not_null()
                            .default("{}"),
                    )
                    .to_owned(),
            )
            .await?;

        // 按密钥与时间查询账本
        manager
            .create_index(
                Index::create()
                    .name("idx_usage_events_key_ts")
                    .table(UsageEvents::Table)
                    .col(UsageEvents::CloudKeyId)
                    .col(UsageEvents::Ts)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_usage_events_session")
                    .table(UsageEvents::Table)
                    .col(UsageEvents::SessionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UsageEvents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UsageEvents {
    Table,
    Id,
    Ts,
    CloudKeyId,
    SessionId,
    Model,
    PromptTokens,
    CompletionTokens,
    BaseCostUsd,
    PlatformFeeUsd,
    TotalCostUsd,
    RequestId,
    Meta,
}
