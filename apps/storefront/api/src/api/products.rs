//! Products API routes

use axum::Router;
use domain_products::{
    LocalMediaStorage, PercentageDiscount, PgProductRepository, ProductService,
    RedisProductCache, handlers,
};

use crate::state::AppState;

/// Create the products router backed by PostgreSQL, Redis and the local media root
pub fn router(state: &AppState) -> Router {
    let repository = PgProductRepository::new(state.db.clone());
    let cache = RedisProductCache::with_ttl(state.redis.clone(), state.config.cache_ttl_secs);
    let pricing = PercentageDiscount::new(state.config.sale_discount_percent);
    let media = LocalMediaStorage::new(&state.config.media_root);

    let service = ProductService::new(repository, cache)
        .with_media(media)
        .with_pricing(pricing);
    handlers::router(service)
}
