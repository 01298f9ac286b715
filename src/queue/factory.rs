//! List store factory

use std::sync::Arc;

use crate::config::QueueConfig;
use crate::redis::RedisPool;

use super::memory_store::MemoryListStore;
use super::redis_store::RedisListStore;
use super::store::ListStore;

/// Create the storage adapter selected by `settings.backend`:
/// - `"redis"`: a `RedisListStore` over `redis_pool`
/// - anything else: a `MemoryListStore`
///
/// Asking for Redis without a pool falls back to memory with a warning.
pub fn create_list_store(
    settings: &QueueConfig,
    redis_pool: Option<Arc<RedisPool>>,
) -> Arc<dyn ListStore> {
    match settings.backend.as_str() {
        "redis" => match redis_pool {
            Some(pool) => {
                tracing::info!(
                    backend = "redis",
                    url = %pool.url(),
                    prefix = %settings.key_prefix,
                    "Creating Redis list store"
                );
                Arc::new(RedisListStore::new(pool))
            }
            None => {
                tracing::warn!("Redis backend requested but no pool provided, falling back to memory");
                Arc::new(MemoryListStore::new())
            }
        },
        other => {
            if other != "memory" {
                tracing::warn!(backend = %other, "Unknown queue backend, using memory");
            }
            tracing::info!(backend = "memory", "Creating in-memory list store");
            Arc::new(MemoryListStore::new())
        }
    }
}
