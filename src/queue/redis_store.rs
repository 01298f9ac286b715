//! Redis list store.
//!
//! Each queue is a Redis list. Producers `LPUSH` and consumers `RPOP`, so the
//! list is kept newest-first and `RPOP` always yields the oldest entry. Both
//! commands are atomic on the server.
//!
//! `BRPOP` is deliberately not used: it would park the shared multiplexed
//! connection for every other caller while it waits.

use std::sync::Arc;

use async_trait::async_trait;

use crate::redis::RedisPool;

use super::store::{ListStore, StoreError};

pub struct RedisListStore {
    pool: Arc<RedisPool>,
}

impl RedisListStore {
    pub fn new(pool: Arc<RedisPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ListStore for RedisListStore {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    async fn push_tail(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.pool.lpush(key, &value).await?;
        Ok(())
    }

    async fn pop_head(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.pool.rpop(key).await?)
    }

    async fn len(&self, key: &str) -> Result<usize, StoreError> {
        Ok(self.pool.llen(key).await?)
    }
}
