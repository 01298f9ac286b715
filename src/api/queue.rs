//! Queue endpoints: submit, long-poll retrieve, and length.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::queue::{QueueMessage, QueueName};
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: QueueMessage,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LengthResponse {
    pub success: bool,
    pub queue_name: String,
    pub length: usize,
}

#[derive(Debug, Deserialize)]
pub struct RetrieveParams {
    /// Milliseconds; kept raw so malformed values get our own 400 body.
    pub timeout: Option<String>,
}

/// POST /api/{queue_name}
#[tracing::instrument(name = "http.submit_message", skip_all, fields(queue = %queue_name))]
pub async fn submit_message(
    State(state): State<AppState>,
    Path(queue_name): Path<String>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    let queue = QueueName::parse(&queue_name)?;
    let Json(body) =
        body.map_err(|e| AppError::Validation(format!("Invalid JSON body: {}", e.body_text())))?;
    let data = extract_data(body)?;

    let message = state.broker.enqueue(&queue, data).await?;

    tracing::info!(message_id = %message.id, "Message added to queue");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            success: true,
            message,
        }),
    ))
}

/// GET /api/{queue_name}?timeout=ms
///
/// 200 with the message, or 204 once the timeout passes with nothing queued.
#[tracing::instrument(
    name = "http.retrieve_message",
    skip_all,
    fields(queue = %queue_name, timeout_ms = tracing::field::Empty)
)]
pub async fn retrieve_message(
    State(state): State<AppState>,
    Path(queue_name): Path<String>,
    params: std::result::Result<Query<RetrieveParams>, QueryRejection>,
) -> Result<Response> {
    let queue = QueueName::parse(&queue_name)?;
    let Query(params) =
        params.map_err(|e| AppError::Validation(format!("Invalid query string: {}", e.body_text())))?;
    let requested = parse_timeout(params.timeout.as_deref())?;
    let timeout = state.settings.queue.effective_timeout(requested);
    tracing::Span::current().record("timeout_ms", timeout.as_millis() as u64);

    match state
        .broker
        .dequeue_blocking(&queue, timeout, &state.cancel)
        .await?
    {
        Some(message) => {
            tracing::info!(message_id = %message.id, "Message delivered");
            Ok((
                StatusCode::OK,
                Json(MessageResponse {
                    success: true,
                    message,
                }),
            )
                .into_response())
        }
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// GET /api/{queue_name}/length
pub async fn queue_length(
    State(state): State<AppState>,
    Path(queue_name): Path<String>,
) -> Result<Json<LengthResponse>> {
    let queue = QueueName::parse(&queue_name)?;
    let length = state.broker.queue_length(&queue).await?;

    Ok(Json(LengthResponse {
        success: true,
        queue_name: queue.to_string(),
        length,
    }))
}

fn extract_data(body: Value) -> Result<Map<String, Value>> {
    match body {
        Value::Object(mut fields) => match fields.remove("data") {
            Some(Value::Object(data)) => Ok(data),
            _ => Err(AppError::Validation(
                "Request body must contain a \"data\" object.".to_string(),
            )),
        },
        _ => Err(AppError::Validation(
            "Request body must be a JSON object.".to_string(),
        )),
    }
}

fn parse_timeout(raw: Option<&str>) -> Result<Option<u64>> {
    match raw {
        None => Ok(None),
        Some(value) => value.parse::<u64>().map(Some).map_err(|_| {
            AppError::Validation(
                "Invalid timeout. Use a non-negative integer number of milliseconds.".to_string(),
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_data_object() {
        let data = extract_data(json!({"data": {"x": 1}, "extra": true})).unwrap();
        assert_eq!(data.get("x"), Some(&json!(1)));
    }

    #[test]
    fn test_extract_data_rejects_missing_or_non_object() {
        for body in [
            json!({}),
            json!({"data": null}),
            json!({"data": [1, 2]}),
            json!({"data": "text"}),
            json!([{"data": {}}]),
            json!("data"),
        ] {
            assert!(
                matches!(extract_data(body.clone()), Err(AppError::Validation(_))),
                "accepted {}",
                body
            );
        }
    }

    #[test]
    fn test_extract_data_allows_empty_object() {
        assert!(extract_data(json!({"data": {}})).unwrap().is_empty());
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout(None).unwrap(), None);
        assert_eq!(parse_timeout(Some("0")).unwrap(), Some(0));
        assert_eq!(parse_timeout(Some("5000")).unwrap(), Some(5000));

        for bad in ["", "-1", "abc", "1.5", "10s"] {
            assert!(parse_timeout(Some(bad)).is_err(), "accepted {:?}", bad);
        }
    }
}
