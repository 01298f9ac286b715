//! Infrastructure layer modules
//!
//! Shared components used by the queue core and the HTTP layer:
//! - `config`: Application configuration and settings
//! - `error`: HTTP-facing error type
//! - `metrics`: Prometheus metrics and recording helpers
//! - `redis`: Redis connection pool, circuit breaker, and health tracking

pub mod config;
pub mod error;
pub mod metrics;
pub mod redis;
