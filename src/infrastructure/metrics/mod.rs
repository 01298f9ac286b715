//! Prometheus metrics for the message queue.
//!
//! Queue names are caller-controlled, so none of these metrics carry a
//! queue label.

mod helpers;

pub use helpers::{encode_metrics, BackendMetrics, LongPollMetrics, QueueMetrics, RedisMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

const METRIC_PREFIX: &str = "ara_mq";

lazy_static! {
    // ============================================================================
    // Queue Metrics
    // ============================================================================

    pub static ref MESSAGES_ENQUEUED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_messages_enqueued_total", METRIC_PREFIX),
        "Total messages appended to a queue"
    ).unwrap();

    pub static ref MESSAGES_DEQUEUED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_messages_dequeued_total", METRIC_PREFIX),
        "Total messages removed from a queue by a consumer"
    ).unwrap();

    /// Dequeue calls that returned no message
    pub static ref DEQUEUE_EMPTY_TOTAL: IntCounter = register_int_counter!(
        format!("{}_dequeue_empty_total", METRIC_PREFIX),
        "Total dequeue calls that found the queue empty"
    ).unwrap();

    // ============================================================================
    // Long Poll Metrics
    // ============================================================================

    pub static ref LONG_POLLS_ACTIVE: IntGauge = register_int_gauge!(
        format!("{}_long_polls_active", METRIC_PREFIX),
        "Number of blocking dequeue calls currently waiting"
    ).unwrap();

    pub static ref LONG_POLL_WAIT_SECONDS: Histogram = register_histogram!(
        format!("{}_long_poll_wait_seconds", METRIC_PREFIX),
        "Time spent inside blocking dequeue calls",
        vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]
    ).unwrap();

    pub static ref LONG_POLLS_CANCELLED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_long_polls_cancelled_total", METRIC_PREFIX),
        "Blocking dequeue calls stopped by shutdown"
    ).unwrap();

    // ============================================================================
    // Backend Metrics
    // ============================================================================

    pub static ref BACKEND_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_backend_errors_total", METRIC_PREFIX),
        "Storage backend errors by operation",
        &["operation"]
    ).unwrap();

    /// Redis connection status (1 = connected, 0 = disconnected)
    pub static ref REDIS_CONNECTION_STATUS: IntGauge = register_int_gauge!(
        format!("{}_redis_connection_status", METRIC_PREFIX),
        "Redis connection status (1=connected, 0=disconnected)"
    ).unwrap();

    /// Redis circuit breaker state (0=closed, 1=open, 2=half-open)
    pub static ref REDIS_CIRCUIT_BREAKER_STATE: IntGauge = register_int_gauge!(
        format!("{}_redis_circuit_breaker_state", METRIC_PREFIX),
        "Redis circuit breaker state (0=closed, 1=open, 2=half-open)"
    ).unwrap();
}
