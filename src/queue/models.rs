//! Queue names and the messages stored in queues.

use std::fmt;

use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

lazy_static! {
    static ref QUEUE_NAME_PATTERN: Regex = Regex::new(r"^[A-Za-z0-9_-]{1,64}$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid queue name. Use 1-64 alphanumeric characters, hyphens, and underscores.")]
pub struct InvalidQueueName;

/// A validated queue name matching `^[A-Za-z0-9_-]{1,64}$`.
///
/// Queues have no lifecycle of their own: a name that was never written to
/// behaves exactly like an empty queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueName(String);

impl QueueName {
    pub fn parse(name: &str) -> Result<Self, InvalidQueueName> {
        if QUEUE_NAME_PATTERN.is_match(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(InvalidQueueName)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for QueueName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A message as stored and returned to consumers.
///
/// Serialized as `{"id", "data", "timestamp", "queueName"}`; the same
/// document is what the store holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueMessage {
    pub id: Uuid,
    /// Producer-supplied document, opaque to the broker
    pub data: Map<String, Value>,
    /// Enqueue time in milliseconds since the Unix epoch
    pub timestamp: i64,
    pub queue_name: String,
}

impl QueueMessage {
    /// Stamp a new message with a random id and the current time.
    pub fn new(queue: &QueueName, data: Map<String, Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            data,
            timestamp: Utc::now().timestamp_millis(),
            queue_name: queue.as_str().to_string(),
        }
    }
}
