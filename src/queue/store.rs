//! Storage adapter abstraction.
//!
//! The broker keeps no queue contents in memory; everything lives behind a
//! `ListStore`, a list-structured key-value store with two primitives.

use async_trait::async_trait;
use thiserror::Error;

use crate::redis::PoolError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Backend is temporarily unavailable (e.g., circuit breaker open)
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl From<PoolError> for StoreError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Redis(e) => StoreError::Redis(e),
            PoolError::CircuitOpen => StoreError::Unavailable("Circuit breaker is open".to_string()),
        }
    }
}

/// List-structured key-value storage.
///
/// Implementations must make `pop_head` a single indivisible
/// remove-and-return: it is the only synchronization point between
/// concurrent consumers of the same queue.
#[async_trait]
pub trait ListStore: Send + Sync {
    /// Short backend identifier ("memory", "redis").
    fn backend_name(&self) -> &'static str;

    /// Append `value` to the tail of the list at `key`, creating it if needed.
    async fn push_tail(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Atomically remove and return the head of the list at `key`.
    /// A missing or empty list yields `Ok(None)`.
    async fn pop_head(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Number of entries in the list at `key` (0 when missing).
    async fn len(&self, key: &str) -> Result<usize, StoreError>;
}
