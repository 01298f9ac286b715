//! Named FIFO queues with long-poll consumption.
//!
//! Producers append JSON documents to a queue; consumers remove the oldest
//! one, optionally waiting up to a timeout for one to arrive. Queue contents
//! live in a `ListStore` (in-memory or Redis); `QueueBroker` adds message
//! identity, ordering, and the wait protocol on top.
//!
//! ```rust,ignore
//! let store = create_list_store(&settings.queue, redis_pool);
//! let broker = QueueBroker::new(store, BrokerConfig::from(&settings.queue));
//!
//! let queue = QueueName::parse("orders")?;
//! broker.enqueue(&queue, data).await?;
//! let next = broker.dequeue_blocking(&queue, Duration::from_secs(5), &cancel).await?;
//! ```

mod broker;
mod factory;
mod memory_store;
mod models;
mod redis_store;
mod store;

pub use broker::{BrokerConfig, BrokerError, BrokerStats, QueueBroker};
pub use factory::create_list_store;
pub use memory_store::MemoryListStore;
pub use models::{InvalidQueueName, QueueMessage, QueueName};
pub use redis_store::RedisListStore;
pub use store::{ListStore, StoreError};
