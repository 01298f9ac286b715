//! Shared Redis connection for the list store.
//!
//! Holds one lazily established multiplexed connection and routes every
//! command through the circuit breaker.

use std::future::Future;
use std::sync::Arc;

use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, AsyncConnectionConfig, Client, RedisError, RedisResult};
use tokio::sync::RwLock;

use crate::config::RedisConfig;

use super::{BackoffConfig, CircuitBreaker, CircuitState, ExponentialBackoff, RedisHealth};

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),

    #[error("Circuit breaker is open")]
    CircuitOpen,
}

pub struct RedisPool {
    client: Client,
    connection: RwLock<Option<MultiplexedConnection>>,
    circuit_breaker: Arc<CircuitBreaker>,
    health: Arc<RedisHealth>,
    config: RedisConfig,
}

impl RedisPool {
    /// Create a pool. No connection is made until the first command.
    pub fn new(
        config: RedisConfig,
        circuit_breaker: Arc<CircuitBreaker>,
        health: Arc<RedisHealth>,
    ) -> Result<Self, PoolError> {
        let client = Client::open(config.url.as_str())?;

        Ok(Self {
            client,
            connection: RwLock::new(None),
            circuit_breaker,
            health,
            config,
        })
    }

    /// Get the shared connection, connecting if needed.
    pub async fn get_connection(&self) -> Result<MultiplexedConnection, PoolError> {
        if !self.circuit_breaker.allow_request() {
            self.health.set_circuit_open();
            return Err(PoolError::CircuitOpen);
        }

        {
            let conn = self.connection.read().await;
            if let Some(ref c) = *conn {
                return Ok(c.clone());
            }
        }

        self.connect().await
    }

    async fn connect(&self) -> Result<MultiplexedConnection, PoolError> {
        let mut guard = self.connection.write().await;

        // Another task may have connected while we waited for the lock
        if let Some(ref c) = *guard {
            return Ok(c.clone());
        }

        self.health.set_reconnecting();

        let connection_config = AsyncConnectionConfig::new()
            .set_connection_timeout(self.config.connection_timeout())
            .set_response_timeout(self.config.response_timeout());

        match self
            .client
            .get_multiplexed_async_connection_with_config(&connection_config)
            .await
        {
            Ok(conn) => {
                *guard = Some(conn.clone());
                self.circuit_breaker.record_success();
                self.health.set_connected();
                tracing::info!("Redis connection established");
                Ok(conn)
            }
            Err(e) => {
                self.circuit_breaker.record_failure();
                tracing::error!(error = %e, "Failed to connect to Redis");
                Err(PoolError::Redis(e))
            }
        }
    }

    /// Run a command on the shared connection and settle its outcome.
    pub async fn execute<F, T, Fut>(&self, f: F) -> Result<T, PoolError>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        let conn = self.get_connection().await?;
        self.settle(f(conn).await).await
    }

    /// Feed a command result into the circuit breaker and health state.
    ///
    /// Only connection-level failures count against the breaker; a server
    /// error reply (e.g. `WRONGTYPE` on one key) proves Redis is reachable.
    /// Broken connections are discarded so the next call reconnects.
    async fn settle<T>(&self, result: RedisResult<T>) -> Result<T, PoolError> {
        match result {
            Ok(value) => {
                self.circuit_breaker.record_success();
                if !self.health.is_healthy() && self.circuit_breaker.state() == CircuitState::Closed {
                    self.health.set_connected();
                }
                Ok(value)
            }
            Err(e) if is_connection_error(&e) => {
                *self.connection.write().await = None;
                self.health.set_reconnecting();
                self.circuit_breaker.record_failure();
                Err(PoolError::Redis(e))
            }
            Err(e) => Err(PoolError::Redis(e)),
        }
    }

    /// `LPUSH key value`
    pub async fn lpush(&self, key: &str, value: &str) -> Result<(), PoolError> {
        let key = key.to_owned();
        let value = value.to_owned();
        self.execute(|mut conn| async move { conn.lpush::<_, _, ()>(key, value).await })
            .await
    }

    /// `RPOP key`, `None` when the list is empty or missing.
    pub async fn rpop(&self, key: &str) -> Result<Option<String>, PoolError> {
        let key = key.to_owned();
        self.execute(|mut conn| async move { conn.rpop::<_, Option<String>>(key, None).await })
            .await
    }

    /// `LLEN key`
    pub async fn llen(&self, key: &str) -> Result<usize, PoolError> {
        let key = key.to_owned();
        self.execute(|mut conn| async move { conn.llen::<_, usize>(key).await })
            .await
    }

    pub async fn ping(&self) -> Result<(), PoolError> {
        self.execute(|mut conn| async move {
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(())
        })
        .await
    }

    /// Ping until Redis answers or `max_attempts` pings have failed.
    pub async fn connect_with_backoff(&self, max_attempts: u32) -> Result<(), PoolError> {
        let mut backoff = ExponentialBackoff::with_config(BackoffConfig::from(&self.config));

        loop {
            match self.ping().await {
                Ok(()) => return Ok(()),
                Err(e) if backoff.attempt() + 1 >= max_attempts => return Err(e),
                Err(e) => {
                    let delay = backoff.next_delay();
                    tracing::warn!(
                        error = %e,
                        attempt = backoff.attempt(),
                        delay_ms = delay.as_millis() as u64,
                        "Redis not reachable, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.health.is_healthy() && self.circuit_breaker.state() == CircuitState::Closed
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    pub fn health(&self) -> &RedisHealth {
        &self.health
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }
}

fn is_connection_error(e: &RedisError) -> bool {
    e.is_connection_dropped() || e.is_io_error() || e.is_timeout() || e.is_connection_refusal()
}
