//! Redis plumbing for the list store
//!
//! - `CircuitBreaker`: fails storage calls fast while Redis is down
//! - `ExponentialBackoff`: delays between startup connection attempts
//! - `RedisHealth`: connection status reported by `/health` and `/stats`
//! - `pool`: shared multiplexed connection exposing the list commands

mod backoff;
mod circuit_breaker;
mod health;
pub mod pool;

pub use backoff::{BackoffConfig, ExponentialBackoff};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
pub use health::{RedisHealth, RedisHealthStats, RedisHealthStatus};
pub use pool::{PoolError, RedisPool};

pub(crate) fn current_time_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
