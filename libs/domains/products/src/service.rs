//! Product Service - Business logic layer

use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

use crate::cache::{ProductCache, cache_key};
use crate::error::{FieldErrors, ProductError, ProductResult};
use crate::media::{LocalMediaStorage, MediaStorage};
use crate::models::{CartItem, CartItemPayload, Product, ProductStats};
use crate::pricing::{Clock, PercentageDiscount, SalePricing, SystemClock};
use crate::query::{ListParams, ProductPage, ProductQuery};
use crate::repository::ProductRepository;
use crate::serializer::{ProductChanges, ProductPayload, ProductView, WriteMode, validate_payload};

/// Product service providing business logic operations
///
/// Writes run the validation pipeline before touching the repository.
/// Successful updates and deletes are mirrored to the cache afterwards; a
/// cache failure is logged and never changes the outcome. Uploaded photos are
/// stored before the product row is written.
pub struct ProductService<R: ProductRepository> {
    repository: Arc<R>,
    cache: Arc<dyn ProductCache>,
    media: Arc<dyn MediaStorage>,
    clock: Arc<dyn Clock>,
    pricing: Arc<dyn SalePricing>,
}

impl<R: ProductRepository> ProductService<R> {
    pub fn new(repository: R, cache: impl ProductCache + 'static) -> Self {
        Self {
            repository: Arc::new(repository),
            cache: Arc::new(cache),
            media: Arc::new(LocalMediaStorage::default()),
            clock: Arc::new(SystemClock),
            pricing: Arc::new(PercentageDiscount::default()),
        }
    }

    pub fn with_media(mut self, media: impl MediaStorage + 'static) -> Self {
        self.media = Arc::new(media);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_pricing(mut self, pricing: impl SalePricing + 'static) -> Self {
        self.pricing = Arc::new(pricing);
        self
    }

    /// Create a new product. The cache is not touched.
    #[instrument(skip(self, payload))]
    pub async fn create_product(&self, payload: ProductPayload) -> ProductResult<ProductView> {
        let mut changes = validate_payload(payload, WriteMode::Create)?;
        self.store_photo(&mut changes).await?;

        let input = changes.into_new_product()?;
        let product = self.repository.create(input).await?;

        Ok(ProductView::project(
            product,
            Vec::new(),
            self.clock.now(),
            self.pricing.as_ref(),
        ))
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: i64) -> ProductResult<ProductView> {
        let product = self.find(id).await?;
        self.view(product).await
    }

    /// List one page of products matching the request query.
    ///
    /// `path` and `pairs` describe the incoming request and are only used
    /// to build the `next`/`previous` links.
    #[instrument(skip(self, pairs))]
    pub async fn list_products(
        &self,
        path: &str,
        pairs: &[(String, String)],
    ) -> ProductResult<ProductPage> {
        let query = ProductQuery::from_params(&ListParams::from_pairs(pairs))?;
        let now = self.clock.now();

        let (count, products) = self.repository.list(&query, now).await?;
        let ids: Vec<i64> = products.iter().map(|p| p.id).collect();

        let mut cart_items: HashMap<i64, Vec<CartItem>> = HashMap::new();
        for item in self.repository.cart_items_for(&ids).await? {
            cart_items
                .entry(item.product_id)
                .or_default()
                .push(item.into());
        }

        let results = products
            .into_iter()
            .map(|product| {
                let items = cart_items.remove(&product.id).unwrap_or_default();
                ProductView::project(product, items, now, self.pricing.as_ref())
            })
            .collect();

        Ok(ProductPage::new(count, results, &query, path, pairs))
    }

    /// Full (`partial == false`) or partial update.
    ///
    /// A missing product is reported before the payload is validated.
    #[instrument(skip(self, payload))]
    pub async fn update_product(
        &self,
        id: i64,
        payload: ProductPayload,
        partial: bool,
    ) -> ProductResult<ProductView> {
        let mut product = self.find(id).await?;

        let mode = if partial {
            WriteMode::Partial
        } else {
            WriteMode::Replace
        };
        let mut changes = validate_payload(payload, mode)?;
        self.store_photo(&mut changes).await?;
        changes.apply_to(&mut product);

        let product = self.repository.update(product).await?;

        let key = cache_key(product.id);
        if let Err(e) = self.cache.set(&key, &product.snapshot()).await {
            tracing::warn!(cache_key = %key, error = %e, "Failed to cache product snapshot");
        }

        self.view(product).await
    }

    /// Delete a product, then evict `product_data_{cache_id}`.
    ///
    /// `cache_id` comes from the request body and is not checked against
    /// `id`; callers fall back to `id` when the body has none.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: i64, cache_id: &str) -> ProductResult<()> {
        if !self.repository.delete(id).await? {
            return Err(ProductError::NotFound(id));
        }

        let key = cache_key(cache_id);
        if let Err(e) = self.cache.delete(&key).await {
            tracing::warn!(cache_key = %key, error = %e, "Failed to evict product snapshot");
        }

        Ok(())
    }

    /// Placeholder statistics for an existing product
    #[instrument(skip(self))]
    pub async fn product_stats(&self, id: i64) -> ProductResult<ProductStats> {
        self.find(id).await?;
        Ok(ProductStats::placeholder())
    }

    #[instrument(skip(self, payload))]
    pub async fn add_cart_item(
        &self,
        product_id: i64,
        payload: CartItemPayload,
    ) -> ProductResult<CartItem> {
        payload
            .validate()
            .map_err(|e| ProductError::Validation(FieldErrors::from(e)))?;

        self.find(product_id).await?;
        let item = self
            .repository
            .create_cart_item(product_id, payload.quantity)
            .await?;

        Ok(item.into())
    }

    /// Saves a validated photo upload and points `photo` at it.
    async fn store_photo(&self, changes: &mut ProductChanges) -> ProductResult<()> {
        if let Some(upload) = changes.photo_upload.take() {
            let reference = self.media.save_photo(&upload).await?;
            changes.photo = Some(Some(reference));
        }
        Ok(())
    }

    async fn find(&self, id: i64) -> ProductResult<Product> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(ProductError::NotFound(id))
    }

    async fn view(&self, product: Product) -> ProductResult<ProductView> {
        let cart_items = self
            .repository
            .cart_items_for(&[product.id])
            .await?
            .into_iter()
            .map(CartItem::from)
            .collect();

        Ok(ProductView::project(
            product,
            cart_items,
            self.clock.now(),
            self.pricing.as_ref(),
        ))
    }
}
