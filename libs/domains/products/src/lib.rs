//! Products Domain
//!
//! Product catalog: listing with search and pagination, validated writes,
//! derived sale pricing, and a write-through cache.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐     ┌─────────────┐
//! │   Service   │ ──► │    Cache    │  ← set on update, delete on destroy
//! └──────┬──────┘ ──┐ └─────────────┘
//!        │          │ ┌─────────────┐
//!        │          └►│    Media    │  ← uploaded photos
//!        │            └─────────────┘
//!        │
//! ┌──────▼──────┐
//! │ Serializer  │  ← validation pipeline, read projection
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← Data access (trait + PostgreSQL / in-memory implementations)
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← Entities, sale window, pricing hook
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_products::{
//!     handlers, PgProductRepository, ProductService, RedisProductCache,
//! };
//!
//! # async fn example(
//! #     db: sea_orm::DatabaseConnection,
//! #     redis: redis::aio::ConnectionManager,
//! # ) {
//! let repository = PgProductRepository::new(db);
//! let cache = RedisProductCache::new(redis);
//! let service = ProductService::new(repository, cache);
//!
//! let router: axum::Router = handlers::router(service);
//! # }
//! ```

pub mod cache;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod media;
pub mod models;
pub mod postgres;
pub mod pricing;
pub mod query;
pub mod repository;
pub mod serializer;
pub mod service;

// Re-export commonly used types
pub use cache::{InMemoryProductCache, ProductCache, RedisProductCache, cache_key};
pub use error::{FieldError, FieldErrorKind, FieldErrors, ProductError, ProductResult};
pub use handlers::ApiDoc;
pub use media::{InMemoryMediaStorage, LocalMediaStorage, MediaStorage, Upload};
pub use models::{CacheSnapshot, CartItem, CartItemPayload, NewProduct, Product, ProductStats};
pub use postgres::PgProductRepository;
pub use pricing::{Clock, FixedClock, PercentageDiscount, SalePricing, SystemClock};
pub use query::{ListParams, ProductPage, ProductQuery};
pub use repository::{InMemoryProductRepository, ProductRepository};
pub use serializer::{CheckedPrice, ProductPayload, ProductView, WriteMode};
pub use service::ProductService;
