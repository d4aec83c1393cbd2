use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PricingOverrides::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PricingOverrides::Model)
                            .string_len(100)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PricingOverrides::InputPer1kUsd)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(PricingOverrides::OutputPer1kUsd)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PricingOverrides::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PricingOverrides {
    Table,
    Model,
    #[sea_orm(iden = "input_per_1k_usd")]
    InputPer1kUsd,
    #[sea_orm(iden = "output_per_1k_usd")]
    OutputPer1kUsd,
}
