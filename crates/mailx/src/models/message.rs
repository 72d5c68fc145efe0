//! Hydrated message handed to the transport layer

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::gmail::api::MessagePart;

/// Unique identifier for a message (Gmail message ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A fully fetched message with its HTML body decoded
///
/// Request-scoped: built by the hydration pipeline, serialized by the caller,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub history_id: u64,
    /// Milliseconds since epoch; the only ordering key for message lists
    pub internal_date: i64,
    pub label_ids: Vec<String>,
    /// Raw MIME part tree as returned by the provider
    pub payload: Option<MessagePart>,
    pub size_estimate: i64,
    pub snippet: String,
    pub thread_id: String,
    /// Decoded `text/html` body, empty when the message has none
    pub html: String,
}
