use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func, IntoCondition};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};

use crate::entity::{product, shopping_cart_item};
use crate::error::{ProductError, ProductResult};
use crate::models::{NewProduct, Product, ShoppingCartItem};
use crate::query::{ProductQuery, like_pattern};
use crate::repository::ProductRepository;

/// PostgreSQL implementation of ProductRepository
#[derive(Clone)]
pub struct PgProductRepository {
    db: DatabaseConnection,
}

impl PgProductRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn filter_condition(query: &ProductQuery, now: DateTime<Utc>) -> Condition {
        let mut condition = Condition::all();

        if let Some(id) = query.id {
            condition = condition.add(product::Column::Id.eq(id));
        }

        if query.on_sale_only {
            let now: sea_orm::prelude::DateTimeWithTimeZone = now.into();
            condition = condition
                .add(product::Column::SaleStart.lte(now))
                .add(product::Column::SaleEnd.gte(now));
        }

        for term in &query.search_terms {
            let pattern = like_pattern(term);
            condition = condition.add(
                Condition::any()
                    .add(lower_like(product::Column::Name, &pattern))
                    .add(lower_like(product::Column::Description, &pattern)),
            );
        }

        condition
    }
}

/// `LOWER(column) LIKE pattern`
fn lower_like(column: product::Column, pattern: &str) -> impl IntoCondition {
    use sea_orm::sea_query::ExprTrait;

    Expr::expr(Func::lower(Expr::col((product::Entity, column)))).like(pattern)
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn create(&self, input: NewProduct) -> ProductResult<Product> {
        let active_model: product::ActiveModel = input.into();
        let model = active_model.insert(&self.db).await?;

        tracing::info!(product_id = model.id, "Created product");
        Ok(model.into())
    }

    async fn get_by_id(&self, id: i64) -> ProductResult<Option<Product>> {
        let model = product::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn list(
        &self,
        query: &ProductQuery,
        now: DateTime<Utc>,
    ) -> ProductResult<(u64, Vec<Product>)> {
        let select = product::Entity::find()
            .filter(Self::filter_condition(query, now))
            .order_by_asc(product::Column::Id);

        let count = select.clone().count(&self.db).await?;
        let models = select
            .limit(query.limit)
            .offset(query.offset)
            .all(&self.db)
            .await?;

        Ok((count, models.into_iter().map(Into::into).collect()))
    }

    async fn update(&self, product: Product) -> ProductResult<Product> {
        let id = product.id;
        let active_model: product::ActiveModel = product.into();

        match active_model.update(&self.db).await {
            Ok(model) => {
                tracing::info!(product_id = id, "Updated product");
                Ok(model.into())
            }
            Err(DbErr::RecordNotUpdated) => Err(ProductError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, id: i64) -> ProductResult<bool> {
        let result = product::Entity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected > 0 {
            tracing::info!(product_id = id, "Deleted product");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn cart_items_for(&self, product_ids: &[i64]) -> ProductResult<Vec<ShoppingCartItem>> {
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = shopping_cart_item::Entity::find()
            .filter(shopping_cart_item::Column::ProductId.is_in(product_ids.iter().copied()))
            .order_by_asc(shopping_cart_item::Column::Id)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn create_cart_item(
        &self,
        product_id: i64,
        quantity: i32,
    ) -> ProductResult<ShoppingCartItem> {
        if product::Entity::find_by_id(product_id)
            .one(&self.db)
            .await?
            .is_none()
        {
            return Err(ProductError::NotFound(product_id));
        }

        let active_model = shopping_cart_item::ActiveModel {
            product_id: sea_orm::ActiveValue::Set(product_id),
            quantity: sea_orm::ActiveValue::Set(quantity),
            ..Default::default()
        };
        let model = active_model.insert(&self.db).await?;

        tracing::info!(product_id, cart_item_id = model.id, "Created cart item");
        Ok(model.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, QueryTrait};

    fn model(id: i64) -> product::Model {
        product::Model {
            id,
            name: "Lamp".to_string(),
            description: "Desk lamp".to_string(),
            price: "10.00".parse().unwrap(),
            sale_start: None,
            sale_end: None,
            photo: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 8, 16, 12, 10, 0).unwrap()
    }

    #[test]
    fn test_filter_condition_sql() {
        let query = ProductQuery {
            id: Some(3),
            search_terms: vec!["water".to_string()],
            on_sale_only: true,
            ..Default::default()
        };

        let sql = product::Entity::find()
            .filter(PgProductRepository::filter_condition(&query, now()))
            .build(DatabaseBackend::Postgres)
            .to_string();

        assert!(sql.contains(r#""products"."id" = 3"#), "{}", sql);
        assert!(sql.contains(r#""sale_start" <="#), "{}", sql);
        assert!(sql.contains(r#""sale_end" >="#), "{}", sql);
        assert!(sql.contains("LOWER("), "{}", sql);
        assert!(sql.contains("LIKE '%water%'"), "{}", sql);
    }

    #[tokio::test]
    async fn test_get_by_id_maps_model() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model(4)]])
            .into_connection();
        let repo = PgProductRepository::new(db);

        let product = repo.get_by_id(4).await.unwrap().unwrap();
        assert_eq!(product.id, 4);
        assert_eq!(product.price.to_string(), "10.00");
    }

    #[tokio::test]
    async fn test_delete_reports_missing_row() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();
        let repo = PgProductRepository::new(db);

        assert!(!repo.delete(5).await.unwrap());
    }

    #[tokio::test]
    async fn test_cart_items_for_no_ids_skips_query() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let repo = PgProductRepository::new(db);

        assert!(repo.cart_items_for(&[]).await.unwrap().is_empty());
    }
}
