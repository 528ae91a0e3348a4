//! Frames, connection options and session outcomes

use base64::Engine;
use indexmap::IndexMap;
use std::time::Duration;

use crate::models::StreamEvent;

/// A frame read from the server
#[derive(Debug, Clone, PartialEq)]
pub enum WsMessage {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close(Option<u16>, String),
}

impl WsMessage {
    /// Lowercase frame kind, used as the stream event type
    pub fn type_name(&self) -> &'static str {
        match self {
            WsMessage::Text(_) => "text",
            WsMessage::Binary(_) => "binary",
            WsMessage::Ping(_) => "ping",
            WsMessage::Pong(_) => "pong",
            WsMessage::Close(_, _) => "close",
        }
    }

    /// Stream event for a data frame; binary payloads are base64-encoded
    pub fn to_event(&self) -> Option<StreamEvent> {
        match self {
            WsMessage::Text(text) => Some(StreamEvent::new(
                text.clone(),
                Some(self.type_name().to_string()),
            )),
            WsMessage::Binary(data) => Some(StreamEvent::new(
                base64::engine::general_purpose::STANDARD.encode(data),
                Some(self.type_name().to_string()),
            )),
            _ => None,
        }
    }
}

/// How to connect and when to stop listening
#[derive(Debug, Clone)]
pub struct WsOptions {
    pub connect_timeout: Duration,
    /// Stop listening after this long without a data frame
    pub idle_timeout: Duration,
    pub max_messages: usize,
    pub headers: IndexMap<String, String>,
    pub protocols: Vec<String>,
}

impl Default for WsOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(5),
            max_messages: 100,
            headers: IndexMap::new(),
            protocols: Vec::new(),
        }
    }
}

/// Why a listening session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Server sent a close frame or dropped the connection
    Closed(Option<u16>, String),
    Idle,
    MessageLimit,
    /// graphql-transport-ws `complete` for our subscription
    Completed,
}

impl SessionEnd {
    pub fn describe(&self) -> String {
        match self {
            SessionEnd::Closed(Some(code), reason) if !reason.is_empty() => {
                format!("Closed ({} {})", code, reason)
            }
            SessionEnd::Closed(Some(code), _) => format!("Closed ({})", code),
            SessionEnd::Closed(None, _) => "Closed".to_string(),
            SessionEnd::Idle => "Idle timeout".to_string(),
            SessionEnd::MessageLimit => "Message limit reached".to_string(),
            SessionEnd::Completed => "Subscription complete".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_event_kind() {
        let event = WsMessage::Text("hi".into()).to_event().unwrap();
        assert_eq!(event.event_type.as_deref(), Some("text"));
        assert_eq!(WsMessage::Close(Some(1000), String::new()).type_name(), "close");
    }

    #[test]
    fn test_to_event() {
        let event = WsMessage::Binary(vec![0xde, 0xad]).to_event().unwrap();
        assert_eq!(event.data, "3q0=");
        assert_eq!(event.event_type.as_deref(), Some("binary"));
        assert!(WsMessage::Ping(vec![]).to_event().is_none());
    }

    #[test]
    fn test_session_end_describe() {
        assert_eq!(SessionEnd::Closed(Some(1000), "bye".into()).describe(), "Closed (1000 bye)");
        assert_eq!(SessionEnd::Idle.describe(), "Idle timeout");
    }
}
