//! Recording helpers so call sites don't touch the statics directly

use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use crate::redis::{CircuitState, RedisHealthStatus};

use super::{
    BACKEND_ERRORS_TOTAL, DEQUEUE_EMPTY_TOTAL, LONG_POLLS_ACTIVE, LONG_POLLS_CANCELLED_TOTAL,
    LONG_POLL_WAIT_SECONDS, MESSAGES_DEQUEUED_TOTAL, MESSAGES_ENQUEUED_TOTAL,
    REDIS_CIRCUIT_BREAKER_STATE, REDIS_CONNECTION_STATUS,
};

/// Encode all registered metrics in the Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

pub struct QueueMetrics;

impl QueueMetrics {
    pub fn record_enqueued() {
        MESSAGES_ENQUEUED_TOTAL.inc();
    }

    pub fn record_dequeued() {
        MESSAGES_DEQUEUED_TOTAL.inc();
    }

    pub fn record_empty() {
        DEQUEUE_EMPTY_TOTAL.inc();
    }
}

pub struct LongPollMetrics;

impl LongPollMetrics {
    pub fn record_started() {
        LONG_POLLS_ACTIVE.inc();
    }

    /// Record the end of a blocking dequeue and how long it waited
    pub fn record_finished(waited: Duration) {
        LONG_POLLS_ACTIVE.dec();
        LONG_POLL_WAIT_SECONDS.observe(waited.as_secs_f64());
    }

    pub fn record_cancelled() {
        LONG_POLLS_CANCELLED_TOTAL.inc();
    }
}

pub struct BackendMetrics;

impl BackendMetrics {
    /// `operation` is one of "push", "pop", "len"
    pub fn record_error(operation: &str) {
        BACKEND_ERRORS_TOTAL.with_label_values(&[operation]).inc();
    }
}

pub struct RedisMetrics;

impl RedisMetrics {
    pub fn set_status(status: RedisHealthStatus, circuit: CircuitState) {
        REDIS_CONNECTION_STATUS.set(if status == RedisHealthStatus::Healthy { 1 } else { 0 });
        REDIS_CIRCUIT_BREAKER_STATE.set(circuit as i64);
    }
}
