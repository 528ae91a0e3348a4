//! Execution results returned by executors

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One message received on a streaming connection (WebSocket or SSE)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub timestamp: DateTime<Utc>,
    pub data: String,
    /// SSE `event:` field, or the WebSocket frame kind / graphql-ws message type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
}

impl StreamEvent {
    pub fn new(data: impl Into<String>, event_type: Option<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            data: data.into(),
            event_type,
        }
    }
}

/// The request exactly as transmitted, after variable resolution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentRequest {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub query_params: IndexMap<String, String>,
}

/// Response produced by any executor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestResponse {
    /// HTTP status; 200 for completed WebSocket sessions, 0 when nothing was received
    pub status_code: u16,
    pub status_message: String,
    pub body: String,
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    /// Wall-clock duration in milliseconds
    pub elapsed_ms: u64,
    pub size_bytes: u64,
    #[serde(default)]
    pub is_streaming: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stream_events: Vec<StreamEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_request: Option<SentRequest>,
}

impl RequestResponse {
    /// 2xx only; 0 and everything else fail
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status_code)
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}
