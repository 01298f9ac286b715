//! In-memory list store using DashMap.
//!
//! Contents are lost on restart. Used for development, tests, and
//! single-instance deployments.

use std::collections::VecDeque;

use async_trait::async_trait;
use dashmap::DashMap;

use super::store::{ListStore, StoreError};

/// One `VecDeque` per key. Every mutation happens under the DashMap shard
/// lock for that key, which makes `pop_head` atomic across tasks.
#[derive(Default)]
pub struct MemoryListStore {
    lists: DashMap<String, VecDeque<String>>,
}

impl MemoryListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-empty lists.
    pub fn key_count(&self) -> usize {
        self.lists.len()
    }
}

#[async_trait]
impl ListStore for MemoryListStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn push_tail(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.lists.entry(key.to_string()).or_default().push_back(value);
        Ok(())
    }

    async fn pop_head(&self, key: &str) -> Result<Option<String>, StoreError> {
        let popped = match self.lists.get_mut(key) {
            Some(mut list) => list.pop_front(),
            None => return Ok(None),
        };

        // Drop the entry once drained; re-checked under the lock in case a
        // producer pushed in between.
        self.lists.remove_if(key, |_, list| list.is_empty());

        Ok(popped)
    }

    async fn len(&self, key: &str) -> Result<usize, StoreError> {
        Ok(self.lists.get(key).map(|list| list.len()).unwrap_or(0))
    }
}
