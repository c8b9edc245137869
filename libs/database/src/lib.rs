//! Connectors for the storefront's backing services.
//!
//! - `postgres` (default): SeaORM connection pool, migrations, health check
//! - `redis` (default): `ConnectionManager` for the product cache, health check
//! - `config`: `core_config::FromEnv` implementations for both configs
//!
//! ```ignore
//! use database::{postgres, redis};
//!
//! let db = postgres::connect_from_config_with_retry(pg_config, None).await?;
//! postgres::run_migrations::<migration::Migrator>(&db, "storefront_api").await?;
//! let cache = redis::connect_from_config_with_retry(redis_config, None).await?;
//! ```

pub mod common;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "redis")]
pub mod redis;

pub use common::{DatabaseError, DatabaseResult};
