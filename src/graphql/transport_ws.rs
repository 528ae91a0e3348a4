//! graphql-transport-ws protocol messages
//!
//! Client flow: `connection_init` → (`connection_ack`) → `subscribe` →
//! `next`* → `complete`. `ping` must be answered with `pong`.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::query::GraphQlPayload;

/// Sub-protocol name sent in `Sec-WebSocket-Protocol`
pub const PROTOCOL: &str = "graphql-transport-ws";

/// Messages the client sends
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    ConnectionInit {
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<JsonValue>,
    },
    Subscribe {
        id: String,
        payload: GraphQlPayload,
    },
    Complete {
        id: String,
    },
    Pong,
}

impl ClientMessage {
    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Messages the server sends
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    ConnectionAck {
        #[serde(default)]
        payload: Option<JsonValue>,
    },
    Next {
        id: String,
        payload: JsonValue,
    },
    Error {
        id: String,
        payload: JsonValue,
    },
    Complete {
        id: String,
    },
    Ping {
        #[serde(default)]
        payload: Option<JsonValue>,
    },
    Pong {
        #[serde(default)]
        payload: Option<JsonValue>,
    },
}

impl ServerMessage {
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }

    /// Wire `type` string, used as the stream event type
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::ConnectionAck { .. } => "connection_ack",
            ServerMessage::Next { .. } => "next",
            ServerMessage::Error { .. } => "error",
            ServerMessage::Complete { .. } => "complete",
            ServerMessage::Ping { .. } => "ping",
            ServerMessage::Pong { .. } => "pong",
        }
    }
}

/// Connection init payload: the request headers, so servers reading auth from
/// the init message see the same credentials as an HTTP request would send
pub fn init_payload(headers: &indexmap::IndexMap<String, String>) -> Option<JsonValue> {
    if headers.is_empty() {
        return None;
    }
    let map: serde_json::Map<String, JsonValue> = headers
        .iter()
        .map(|(k, v)| (k.clone(), JsonValue::String(v.clone())))
        .collect();
    Some(JsonValue::Object(map))
}
