//! Write-through product cache.
//!
//! Entries are written after a successful update and removed after a
//! successful delete. Nothing in this crate reads them back.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::ProductResult;
use crate::models::CacheSnapshot;

/// Default entry lifetime in seconds
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// `product_data_{id}`
pub fn cache_key(id: impl Display) -> String {
    format!("product_data_{}", id)
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductCache: Send + Sync {
    /// Overwrites any existing entry under `key`
    async fn set(&self, key: &str, snapshot: &CacheSnapshot) -> ProductResult<()>;

    async fn delete(&self, key: &str) -> ProductResult<()>;
}

/// Redis-backed cache storing JSON snapshots with `SET EX`.
#[derive(Clone)]
pub struct RedisProductCache {
    redis: ConnectionManager,
    ttl_secs: u64,
}

impl RedisProductCache {
    pub fn new(redis: ConnectionManager) -> Self {
        Self::with_ttl(redis, DEFAULT_CACHE_TTL_SECS)
    }

    pub fn with_ttl(redis: ConnectionManager, ttl_secs: u64) -> Self {
        Self { redis, ttl_secs }
    }
}

#[async_trait]
impl ProductCache for RedisProductCache {
    async fn set(&self, key: &str, snapshot: &CacheSnapshot) -> ProductResult<()> {
        let mut conn = self.redis.clone();
        let value = serde_json::to_string(snapshot)?;

        conn.set_ex::<_, _, ()>(key, value, self.ttl_secs).await?;

        tracing::debug!(cache_key = %key, ttl_secs = self.ttl_secs, "Cached product snapshot");
        Ok(())
    }

    async fn delete(&self, key: &str) -> ProductResult<()> {
        let mut conn = self.redis.clone();
        conn.del::<_, ()>(key).await?;

        tracing::debug!(cache_key = %key, "Evicted product snapshot");
        Ok(())
    }
}

/// In-memory cache (for development/testing). Entries never expire.
#[derive(Debug, Default, Clone)]
pub struct InMemoryProductCache {
    entries: Arc<RwLock<HashMap<String, CacheSnapshot>>>,
}

impl InMemoryProductCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<CacheSnapshot> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ProductCache for InMemoryProductCache {
    async fn set(&self, key: &str, snapshot: &CacheSnapshot) -> ProductResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), snapshot.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> ProductResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
