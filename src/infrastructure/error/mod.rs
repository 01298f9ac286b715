use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::queue::{BrokerError, InvalidQueueName};
use crate::redis::PoolError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Queue error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Redis error: {0}")]
    Redis(#[from] PoolError),
}

impl From<InvalidQueueName> for AppError {
    fn from(err: InvalidQueueName) -> Self {
        AppError::Validation(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Backend detail is logged, never returned to the client
        let (status, code, client_message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Broker(BrokerError::Cancelled) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SHUTTING_DOWN",
                "Server is shutting down".to_string(),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(code = %code, status = %status.as_u16(), error = %self, "API error");
        } else {
            tracing::debug!(code = %code, status = %status.as_u16(), error = %self, "Request rejected");
        }

        let body = ErrorResponse {
            success: false,
            error: client_message,
            code,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
