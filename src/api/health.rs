//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::queue::BrokerStats;
use crate::redis::RedisPool;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime_seconds: u64,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis: Option<RedisHealthResponse>,
}

#[derive(Debug, Serialize)]
pub struct RedisHealthResponse {
    pub status: String,
    pub connected: bool,
    pub circuit_breaker_state: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub uptime_seconds: u64,
    pub queue: BrokerStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis: Option<RedisStats>,
}

#[derive(Debug, Serialize)]
pub struct RedisStats {
    pub status: String,
    pub connected: bool,
    pub circuit_breaker_state: String,
    pub circuit_breaker_failures: u32,
    pub reconnection_attempts: u32,
    pub total_reconnections: u32,
}

impl From<&RedisPool> for RedisStats {
    fn from(pool: &RedisPool) -> Self {
        let health = pool.health().stats();
        let circuit = pool.circuit_breaker().stats();

        Self {
            status: health.status.as_str().to_string(),
            connected: pool.is_healthy(),
            circuit_breaker_state: circuit.state.as_str().to_string(),
            circuit_breaker_failures: circuit.failure_count,
            reconnection_attempts: health.reconnection_attempts,
            total_reconnections: health.total_reconnections,
        }
    }
}

/// GET /health
///
/// Always 200. `status` is "degraded" while the Redis backend is
/// unreachable or its circuit breaker is not closed.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let redis = state.redis_pool.as_deref().map(|pool| RedisHealthResponse {
        status: pool.health().status().as_str().to_string(),
        connected: pool.is_healthy(),
        circuit_breaker_state: pool.circuit_state().as_str().to_string(),
    });

    let healthy = redis.as_ref().map_or(true, |r| r.connected);

    Json(HealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        backend: state.broker.backend_name().to_string(),
        redis,
    })
}

/// GET /stats
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        uptime_seconds: state.start_time.elapsed().as_secs(),
        queue: state.broker.stats(),
        redis: state.redis_pool.as_deref().map(RedisStats::from),
    })
}
