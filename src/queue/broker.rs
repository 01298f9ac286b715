//! Queue broker: enqueue, dequeue, and long-poll dequeue on top of a `ListStore`.
//!
//! The broker is stateless with respect to queue contents. Every call goes
//! to the store, so one `QueueBroker` can be shared by all request tasks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::time::Instant;

use crate::config::QueueConfig;
use crate::metrics::{BackendMetrics, LongPollMetrics, QueueMetrics};
use crate::shutdown::CancelSignal;

use super::models::{QueueMessage, QueueName};
use super::store::{ListStore, StoreError};

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The wait was interrupted by shutdown
    #[error("Dequeue cancelled")]
    Cancelled,
}

impl BrokerError {
    /// Whether a later poll might succeed where this one failed.
    fn is_retryable(&self) -> bool {
        matches!(self, BrokerError::Storage(_))
    }
}

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Storage key is `{key_prefix}:{queue_name}`
    pub key_prefix: String,
    pub poll_interval: Duration,
    /// Consecutive storage failures tolerated while waiting
    pub max_poll_errors: u32,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            key_prefix: "queue".to_string(),
            poll_interval: Duration::from_millis(100),
            max_poll_errors: 3,
        }
    }
}

impl From<&QueueConfig> for BrokerConfig {
    fn from(config: &QueueConfig) -> Self {
        Self {
            key_prefix: config.key_prefix.clone(),
            poll_interval: config.poll_interval(),
            max_poll_errors: config.max_poll_errors,
        }
    }
}

/// Steps of a single blocking dequeue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollState {
    /// Try the store; found returns, empty waits
    Check,
    /// Sleep one interval (or whatever is left of the timeout)
    Waiting,
    /// Deadline reached: one last attempt, whatever it yields is final
    FinalCheck,
}

#[derive(Default)]
struct BrokerCounters {
    enqueued: AtomicU64,
    dequeued: AtomicU64,
    empty: AtomicU64,
    active_long_polls: AtomicU64,
    backend_errors: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BrokerStats {
    pub backend: String,
    pub enqueued: u64,
    pub dequeued: u64,
    pub empty_results: u64,
    pub active_long_polls: u64,
    pub backend_errors: u64,
}

/// Decrements the active long-poll count however the poll ends,
/// including when the future is dropped mid-wait.
struct LongPollGuard<'a> {
    counters: &'a BrokerCounters,
    started: Instant,
}

impl<'a> LongPollGuard<'a> {
    fn new(counters: &'a BrokerCounters) -> Self {
        counters.active_long_polls.fetch_add(1, Ordering::Relaxed);
        LongPollMetrics::record_started();
        Self {
            counters,
            started: Instant::now(),
        }
    }
}

impl Drop for LongPollGuard<'_> {
    fn drop(&mut self) {
        self.counters.active_long_polls.fetch_sub(1, Ordering::Relaxed);
        LongPollMetrics::record_finished(self.started.elapsed());
    }
}

pub struct QueueBroker {
    store: Arc<dyn ListStore>,
    config: BrokerConfig,
    counters: BrokerCounters,
}

impl QueueBroker {
    pub fn new(store: Arc<dyn ListStore>, config: BrokerConfig) -> Self {
        Self {
            store,
            config,
            counters: BrokerCounters::default(),
        }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    fn queue_key(&self, queue: &QueueName) -> String {
        format!("{}:{}", self.config.key_prefix, queue)
    }

    fn record_backend_error(&self, operation: &str) {
        self.counters.backend_errors.fetch_add(1, Ordering::Relaxed);
        BackendMetrics::record_error(operation);
    }

    /// Append a new message to the tail of `queue` and return it.
    ///
    /// Either the append succeeds and the message is visible to the next
    /// dequeue, or an error is returned and nothing was stored.
    pub async fn enqueue(
        &self,
        queue: &QueueName,
        data: Map<String, Value>,
    ) -> Result<QueueMessage, BrokerError> {
        let message = QueueMessage::new(queue, data);
        let body = serde_json::to_string(&message)?;

        if let Err(e) = self.store.push_tail(&self.queue_key(queue), body).await {
            self.record_backend_error("push");
            return Err(e.into());
        }

        self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
        QueueMetrics::record_enqueued();

        tracing::debug!(queue = %queue, message_id = %message.id, "Message enqueued");

        Ok(message)
    }

    fn record_empty(&self) {
        self.counters.empty.fetch_add(1, Ordering::Relaxed);
        QueueMetrics::record_empty();
    }

    /// Remove and return the oldest message of `queue`, or `None` if empty.
    pub async fn dequeue(&self, queue: &QueueName) -> Result<Option<QueueMessage>, BrokerError> {
        let message = self.pop_once(queue).await?;
        if message.is_none() {
            self.record_empty();
        }
        Ok(message)
    }

    /// One store attempt. Empty results are not counted here so a long poll
    /// counts as a single empty result however many times it checks.
    async fn pop_once(&self, queue: &QueueName) -> Result<Option<QueueMessage>, BrokerError> {
        let raw = match self.store.pop_head(&self.queue_key(queue)).await {
            Ok(raw) => raw,
            Err(e) => {
                self.record_backend_error("pop");
                return Err(e.into());
            }
        };

        let Some(raw) = raw else {
            return Ok(None);
        };

        // The entry is already gone from the store; an undecodable body is
        // reported rather than skipped.
        let message: QueueMessage = serde_json::from_str(&raw).map_err(|e| {
            tracing::error!(queue = %queue, error = %e, "Discarding undecodable queue entry");
            e
        })?;

        self.counters.dequeued.fetch_add(1, Ordering::Relaxed);
        QueueMetrics::record_dequeued();

        tracing::debug!(queue = %queue, message_id = %message.id, "Message dequeued");

        Ok(Some(message))
    }

    /// Long-poll dequeue.
    ///
    /// Returns immediately when a message is available. Otherwise polls
    /// every `poll_interval` until one arrives or `timeout` elapses, then
    /// makes one final attempt. A zero timeout is a single non-blocking
    /// attempt. Returns no later than `timeout` plus one store round-trip.
    ///
    /// Storage errors while waiting are retried on the next poll, up to
    /// `max_poll_errors` in a row; the final attempt's error always
    /// propagates. Which of several concurrent waiters gets a newly arrived
    /// message is unspecified.
    pub async fn dequeue_blocking(
        &self,
        queue: &QueueName,
        timeout: Duration,
        cancel: &CancelSignal,
    ) -> Result<Option<QueueMessage>, BrokerError> {
        let _guard = LongPollGuard::new(&self.counters);
        let deadline = Instant::now() + timeout;
        let mut consecutive_errors = 0u32;
        let mut state = PollState::Check;

        loop {
            if cancel.is_cancelled() {
                LongPollMetrics::record_cancelled();
                return Err(BrokerError::Cancelled);
            }

            state = match state {
                PollState::Check if Instant::now() >= deadline => PollState::FinalCheck,
                PollState::Check => match self.pop_once(queue).await {
                    Ok(Some(message)) => return Ok(Some(message)),
                    Ok(None) => {
                        consecutive_errors = 0;
                        PollState::Waiting
                    }
                    Err(e) if e.is_retryable() && consecutive_errors + 1 < self.config.max_poll_errors => {
                        consecutive_errors += 1;
                        tracing::warn!(
                            queue = %queue,
                            error = %e,
                            consecutive_errors = consecutive_errors,
                            "Storage error while long polling, will retry"
                        );
                        PollState::Waiting
                    }
                    Err(e) => return Err(e),
                },
                PollState::Waiting => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    let nap = self.config.poll_interval.min(remaining);

                    tokio::select! {
                        _ = tokio::time::sleep(nap) => {}
                        _ = cancel.cancelled() => {
                            LongPollMetrics::record_cancelled();
                            return Err(BrokerError::Cancelled);
                        }
                    }

                    PollState::Check
                }
                PollState::FinalCheck => return self.dequeue(queue).await,
            };
        }
    }

    /// Number of messages currently waiting in `queue`.
    pub async fn queue_length(&self, queue: &QueueName) -> Result<usize, BrokerError> {
        match self.store.len(&self.queue_key(queue)).await {
            Ok(len) => Ok(len),
            Err(e) => {
                self.record_backend_error("len");
                Err(e.into())
            }
        }
    }

    pub fn stats(&self) -> BrokerStats {
        BrokerStats {
            backend: self.store.backend_name().to_string(),
            enqueued: self.counters.enqueued.load(Ordering::Relaxed),
            dequeued: self.counters.dequeued.load(Ordering::Relaxed),
            empty_results: self.counters.empty.load(Ordering::Relaxed),
            active_long_polls: self.counters.active_long_polls.load(Ordering::Relaxed),
            backend_errors: self.counters.backend_errors.load(Ordering::Relaxed),
        }
    }
}
