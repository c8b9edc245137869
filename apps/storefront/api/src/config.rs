//! Configuration for the storefront API

use core_config::{
    AppInfo, FromEnv, app_info, env_or_default, env_parse_or, server::ServerConfig,
};
use database::postgres::PostgresConfig;
use database::redis::RedisConfig;
use domain_products::PercentageDiscount;
use domain_products::cache::DEFAULT_CACHE_TTL_SECS;
use domain_products::media::DEFAULT_MEDIA_ROOT;
use rust_decimal::Decimal;
use std::path::PathBuf;

pub use core_config::Environment;

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub database: PostgresConfig,
    pub redis: RedisConfig,
    pub server: ServerConfig,
    pub environment: Environment,
    /// Lifetime of product cache entries (`PRODUCT_CACHE_TTL_SECS`)
    pub cache_ttl_secs: u64,
    /// Discount applied inside a sale window (`SALE_DISCOUNT_PERCENT`)
    pub sale_discount_percent: Decimal,
    /// Directory uploaded product photos are written below (`MEDIA_ROOT`)
    pub media_root: PathBuf,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let database = PostgresConfig::from_env()?;
        let redis = RedisConfig::from_env()?;
        let server = ServerConfig::from_env()?;

        let cache_ttl_secs = env_parse_or("PRODUCT_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?;
        let sale_discount_percent = env_parse_or(
            "SALE_DISCOUNT_PERCENT",
            Decimal::from(PercentageDiscount::DEFAULT_PERCENT),
        )?;
        let media_root = PathBuf::from(env_or_default("MEDIA_ROOT", DEFAULT_MEDIA_ROOT));

        Ok(Self {
            app: app_info!(),
            database,
            redis,
            server,
            environment,
            cache_ttl_secs,
            sale_discount_percent,
            media_root,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [(&str, Option<&str>); 2] = [
        ("DATABASE_URL", Some("postgres://localhost/storefront")),
        ("REDIS_URL", Some("redis://127.0.0.1:6379")),
    ];

    #[test]
    fn test_defaults() {
        let vars = [
            REQUIRED[0],
            REQUIRED[1],
            ("PRODUCT_CACHE_TTL_SECS", None),
            ("SALE_DISCOUNT_PERCENT", None),
            ("MEDIA_ROOT", None),
        ];
        temp_env::with_vars(vars, || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.media_root, PathBuf::from("media"));
            assert_eq!(config.cache_ttl_secs, 300);
            assert_eq!(config.sale_discount_percent, Decimal::from(10));
            assert_eq!(config.app.name, "storefront_api");
        });
    }

    #[test]
    fn test_overrides() {
        let vars = [
            REQUIRED[0],
            REQUIRED[1],
            ("PRODUCT_CACHE_TTL_SECS", Some("60")),
            ("SALE_DISCOUNT_PERCENT", Some("12.5")),
            ("MEDIA_ROOT", Some("/var/lib/storefront/media")),
        ];
        temp_env::with_vars(vars, || {
            let config = Config::from_env().unwrap();
            assert_eq!(
                config.media_root,
                PathBuf::from("/var/lib/storefront/media")
            );
            assert_eq!(config.cache_ttl_secs, 60);
            assert_eq!(config.sale_discount_percent.to_string(), "12.5");
        });
    }

    #[test]
    fn test_bad_ttl_is_an_error() {
        let vars = [
            REQUIRED[0],
            REQUIRED[1],
            ("PRODUCT_CACHE_TTL_SECS", Some("forever")),
        ];
        temp_env::with_vars(vars, || {
            let err = Config::from_env().unwrap_err();
            assert!(err.to_string().contains("PRODUCT_CACHE_TTL_SECS"));
        });
    }

    #[test]
    fn test_missing_database_url_is_an_error() {
        let vars = [("DATABASE_URL", None), REQUIRED[1]];
        temp_env::with_vars(vars, || {
            assert!(Config::from_env().is_err());
        });
    }
}
