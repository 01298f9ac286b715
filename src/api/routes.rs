use axum::{
    routing::{get, post},
    Router,
};

use crate::server::AppState;

use super::health::{health, stats};
use super::metrics::prometheus_metrics;
use super::queue::{queue_length, retrieve_message, submit_message};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health & Stats
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        // Queues
        .nest(
            "/api",
            Router::new()
                .route("/{queue_name}", post(submit_message).get(retrieve_message))
                .route("/{queue_name}/length", get(queue_length)),
        )
}
