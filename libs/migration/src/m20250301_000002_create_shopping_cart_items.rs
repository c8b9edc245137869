use sea_orm_migration::{prelude::*, schema::*};

use crate::m20250301_000001_create_products::Products;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ShoppingCartItems::Table)
                    .if_not_exists()
                    .col(
                        big_integer(ShoppingCartItems::Id)
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(big_integer(ShoppingCartItems::ProductId))
                    .col(integer(ShoppingCartItems::Quantity))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_shopping_cart_items_product_id")
                            .from(ShoppingCartItems::Table, ShoppingCartItems::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_shopping_cart_items_product_id")
                    .table(ShoppingCartItems::Table)
                    .col(ShoppingCartItems::ProductId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ShoppingCartItems::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ShoppingCartItems {
    Table,
    Id,
    ProductId,
    Quantity,
}
