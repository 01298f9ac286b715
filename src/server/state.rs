use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::error::AppError;
use crate::queue::{create_list_store, BrokerConfig, ListStore, QueueBroker};
use crate::redis::{CircuitBreaker, CircuitBreakerConfig, RedisHealth, RedisPool};
use crate::shutdown::CancelSignal;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub broker: Arc<QueueBroker>,
    /// Present only when the Redis backend is selected
    pub redis_pool: Option<Arc<RedisPool>>,
    /// Fires on server shutdown; handed to every long poll
    pub cancel: CancelSignal,
    pub start_time: Instant,
}

impl AppState {
    /// Build state from settings, creating the Redis pool when the queue
    /// backend is `"redis"`. The pool connects lazily.
    pub fn new(settings: Settings, cancel: CancelSignal) -> Result<Self, AppError> {
        let redis_pool = if settings.queue.backend == "redis" {
            let circuit_breaker = Arc::new(CircuitBreaker::with_config(CircuitBreakerConfig::from(
                &settings.redis,
            )));
            let health = Arc::new(RedisHealth::new());
            Some(Arc::new(RedisPool::new(
                settings.redis.clone(),
                circuit_breaker,
                health,
            )?))
        } else {
            None
        };

        let store = create_list_store(&settings.queue, redis_pool.clone());
        Ok(Self::build(settings, store, redis_pool, cancel))
    }

    /// Build state around an existing store (tests, embedding).
    pub fn with_store(settings: Settings, store: Arc<dyn ListStore>, cancel: CancelSignal) -> Self {
        Self::build(settings, store, None, cancel)
    }

    fn build(
        settings: Settings,
        store: Arc<dyn ListStore>,
        redis_pool: Option<Arc<RedisPool>>,
        cancel: CancelSignal,
    ) -> Self {
        let broker = Arc::new(QueueBroker::new(store, BrokerConfig::from(&settings.queue)));

        Self {
            settings: Arc::new(settings),
            broker,
            redis_pool,
            cancel,
            start_time: Instant::now(),
        }
    }
}
