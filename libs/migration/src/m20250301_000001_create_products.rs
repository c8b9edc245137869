use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(big_integer(Products::Id).auto_increment().primary_key())
                    .col(string_len(Products::Name, 200))
                    .col(text(Products::Description))
                    .col(decimal_len(Products::Price, 12, 2))
                    .col(timestamp_with_time_zone_null(Products::SaleStart))
                    .col(timestamp_with_time_zone_null(Products::SaleEnd))
                    .col(string_null(Products::Photo))
                    .to_owned(),
            )
            .await?;

        // On-sale listing filters on both bounds
        manager
            .create_index(
                Index::create()
                    .name("idx_products_sale_window")
                    .table(Products::Table)
                    .col(Products::SaleStart)
                    .col(Products::SaleEnd)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Products {
    Table,
    Id,
    Name,
    Description,
    Price,
    SaleStart,
    SaleEnd,
    Photo,
}
