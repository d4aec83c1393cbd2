use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CloudApiKeys::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CloudApiKeys::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CloudApiKeys::Key)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(CloudApiKeys::Label).string_len(255))
                    .col(
                        ColumnDef::new(CloudApiKeys::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CloudApiKeys::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CloudApiKeys {
    Table,
    Id,
    Key,
    Label,
    CreatedAt,
}
