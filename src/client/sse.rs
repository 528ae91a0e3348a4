//! Server-sent events (`text/event-stream`) parsing

use reqwest::Response;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::errors::{ApiFlowError, Result};
use crate::models::StreamEvent;

/// Incremental SSE parser fed with raw body chunks
///
/// Bytes are buffered until a full line arrives, so a UTF-8 sequence split
/// across chunks decodes intact.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    event_type: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every event completed by it
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = self.process_line(line.trim_end_matches(['\n', '\r'])) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing event that was not followed by a blank line
    pub fn finish(&mut self) -> Option<StreamEvent> {
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = self.process_line(line.trim_end_matches('\r')) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<StreamEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };
        match field {
            "event" => self.event_type = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<StreamEvent> {
        let event_type = self.event_type.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(StreamEvent::new(data, event_type))
    }
}

/// Limits applied while draining a stream
#[derive(Debug, Clone, Copy)]
pub struct StreamLimits {
    pub max_events: usize,
    pub idle_timeout: Duration,
}

/// Drain an SSE response until it ends, goes idle, or hits the event limit
///
/// Returns the collected events and the raw body that was read.
pub async fn collect_events(
    response: &mut Response,
    limits: StreamLimits,
    cancel: &CancellationToken,
) -> Result<(Vec<StreamEvent>, Vec<u8>)> {
    let mut parser = SseParser::new();
    let mut events = Vec::new();
    let mut raw = Vec::new();

    while events.len() < limits.max_events {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ApiFlowError::Cancelled),
            _ = tokio::time::sleep(limits.idle_timeout) => {
                tracing::debug!("event stream idle, closing");
                break;
            }
            result = response.chunk() => result.map_err(ApiFlowError::Request)?,
        };
        let Some(bytes) = chunk else {
            events.extend(parser.finish());
            break;
        };
        raw.extend_from_slice(&bytes);
        events.extend(parser.feed(&bytes));
    }

    events.truncate(limits.max_events);
    Ok((events, raw))
}
