//! API layer - HTTP endpoint handlers.

mod health;
mod metrics;
mod queue;
mod routes;

pub use health::{health, stats, HealthResponse, StatsResponse};
pub use metrics::prometheus_metrics;
pub use queue::{queue_length, retrieve_message, submit_message, LengthResponse, MessageResponse};
pub use routes::api_routes;
