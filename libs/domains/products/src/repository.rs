use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{ProductError, ProductResult};
use crate::models::{NewProduct, Product, ShoppingCartItem};
use crate::query::ProductQuery;

/// Repository trait for Product persistence
///
/// Implementations must enumerate products in ascending id order so that
/// limit/offset pages are stable.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Insert a product and assign its id
    async fn create(&self, input: NewProduct) -> ProductResult<Product>;

    async fn get_by_id(&self, id: i64) -> ProductResult<Option<Product>>;

    /// Total number of matches and the requested page
    async fn list(
        &self,
        query: &ProductQuery,
        now: DateTime<Utc>,
    ) -> ProductResult<(u64, Vec<Product>)>;

    /// Persist every writable field of `product`
    async fn update(&self, product: Product) -> ProductResult<Product>;

    /// Returns false when no product had this id
    async fn delete(&self, id: i64) -> ProductResult<bool>;

    /// Cart items referencing any of `product_ids`, in id order
    async fn cart_items_for(&self, product_ids: &[i64]) -> ProductResult<Vec<ShoppingCartItem>>;

    async fn create_cart_item(
        &self,
        product_id: i64,
        quantity: i32,
    ) -> ProductResult<ShoppingCartItem>;
}

#[derive(Debug, Default)]
struct Store {
    products: BTreeMap<i64, Product>,
    cart_items: BTreeMap<i64, ShoppingCartItem>,
    last_product_id: i64,
    last_cart_item_id: i64,
}

/// In-memory implementation of ProductRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryProductRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn create(&self, input: NewProduct) -> ProductResult<Product> {
        let mut store = self.store.write().await;

        store.last_product_id += 1;
        let product = input.into_product(store.last_product_id);
        store.products.insert(product.id, product.clone());

        tracing::info!(product_id = product.id, "Created product");
        Ok(product)
    }

    async fn get_by_id(&self, id: i64) -> ProductResult<Option<Product>> {
        let store = self.store.read().await;
        Ok(store.products.get(&id).cloned())
    }

    async fn list(
        &self,
        query: &ProductQuery,
        now: DateTime<Utc>,
    ) -> ProductResult<(u64, Vec<Product>)> {
        let store = self.store.read().await;

        let matching: Vec<&Product> = store
            .products
            .values()
            .filter(|p| query.matches(p, now))
            .collect();

        let count = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .cloned()
            .collect();

        Ok((count, page))
    }

    async fn update(&self, product: Product) -> ProductResult<Product> {
        let mut store = self.store.write().await;

        let slot = store
            .products
            .get_mut(&product.id)
            .ok_or(ProductError::NotFound(product.id))?;
        *slot = product.clone();

        tracing::info!(product_id = product.id, "Updated product");
        Ok(product)
    }

    async fn delete(&self, id: i64) -> ProductResult<bool> {
        let mut store = self.store.write().await;

        if store.products.remove(&id).is_none() {
            return Ok(false);
        }
        store.cart_items.retain(|_, item| item.product_id != id);

        tracing::info!(product_id = id, "Deleted product");
        Ok(true)
    }

    async fn cart_items_for(&self, product_ids: &[i64]) -> ProductResult<Vec<ShoppingCartItem>> {
        let store = self.store.read().await;
        Ok(store
            .cart_items
            .values()
            .filter(|item| product_ids.contains(&item.product_id))
            .cloned()
            .collect())
    }

    async fn create_cart_item(
        &self,
        product_id: i64,
        quantity: i32,
    ) -> ProductResult<ShoppingCartItem> {
        let mut store = self.store.write().await;

        if !store.products.contains_key(&product_id) {
            return Err(ProductError::NotFound(product_id));
        }

        store.last_cart_item_id += 1;
        let item = ShoppingCartItem {
            id: store.last_cart_item_id,
            product_id,
            quantity,
        };
        store.cart_items.insert(item.id, item.clone());

        tracing::info!(product_id, cart_item_id = item.id, "Created cart item");
        Ok(item)
    }
}
